//! Interactive scan loop: camera, capture, review, save.

use anyhow::{anyhow, Result};
use cardscan_config::CardScanConfig;
use cardscan_core::{FacingMode, SubmissionOutcome};
use cardscan_scanner::{ScanPhase, ScanState, Scanner};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::watch;

use crate::runtime;
use crate::terminal_output::{
    note_error, note_info, note_success, note_warn, render_fields, render_model_used,
};

enum ReviewChoice {
    Save,
    Retry,
    New,
    Quit,
}

pub async fn run(config: &CardScanConfig, facing: FacingMode, auto: bool) -> Result<()> {
    let mut scanner = runtime::scanner(config, facing)?;
    tokio::spawn(report_progress(scanner.subscribe()));

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let result = scan_loop(&mut scanner, &mut input, auto).await;
    scanner.shutdown();
    result
}

async fn scan_loop<R>(scanner: &mut Scanner, input: &mut Lines<R>, auto: bool) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        if scanner.open_camera().await.is_err() {
            show_camera_error(scanner);
            return Err(anyhow!("camera unavailable"));
        }
        match scanner.wait_until_ready().await {
            Ok(dims) => note_info(&format!("Camera ready ({}x{})", dims.width, dims.height)),
            Err(_) => {
                show_camera_error(scanner);
                return Err(anyhow!("camera did not become ready"));
            }
        }

        if !auto {
            let answer = prompt(input, "Press Enter to capture, or q to quit: ").await?;
            let quit = match answer.as_deref() {
                None => true,
                Some(a) => a.eq_ignore_ascii_case("q"),
            };
            if quit {
                scanner.close_camera();
                return Ok(());
            }
        }

        match scanner.capture().await {
            Ok(_) => show_review(&scanner.snapshot()),
            Err(_) if scanner.phase() == ScanPhase::Reviewing => {
                show_extraction_error(scanner);
                if auto {
                    scanner.scan_new();
                    return Err(anyhow!("extraction failed"));
                }
            }
            Err(_) => {
                show_camera_error(scanner);
                if auto {
                    return Err(anyhow!("capture failed"));
                }
                continue;
            }
        }

        if !review_loop(scanner, input, auto).await? {
            return Ok(());
        }
        if auto {
            return Ok(());
        }
    }
}

/// Returns `false` when the user wants to stop scanning.
async fn review_loop<R>(scanner: &mut Scanner, input: &mut Lines<R>, auto: bool) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let choice = if auto {
            if scanner.snapshot().can_save() { ReviewChoice::Save } else { ReviewChoice::Quit }
        } else {
            ask_review_choice(scanner, input).await?
        };

        match choice {
            ReviewChoice::Save => match scanner.save().await {
                Ok(SubmissionOutcome::Accepted { status }) => {
                    note_success(&format!("Saved (webhook answered {status})"));
                    return Ok(true);
                }
                Ok(SubmissionOutcome::Unconfirmed) => {
                    note_success("Sent to webhook (delivery is not confirmed in fire-and-forget mode)");
                    return Ok(true);
                }
                Err(e) => {
                    note_error(&e.to_string());
                    scanner.dismiss_submission_error();
                    if auto {
                        return Err(e.into());
                    }
                }
            },
            ReviewChoice::Retry => match scanner.retry_extraction().await {
                Ok(_) => show_review(&scanner.snapshot()),
                Err(_) => show_extraction_error(scanner),
            },
            ReviewChoice::New => {
                scanner.scan_new();
                return Ok(true);
            }
            ReviewChoice::Quit => {
                scanner.scan_new();
                return Ok(false);
            }
        }
    }
}

async fn ask_review_choice<R>(scanner: &Scanner, input: &mut Lines<R>) -> Result<ReviewChoice>
where
    R: AsyncBufRead + Unpin,
{
    let can_save = scanner.snapshot().can_save();
    let question = if can_save {
        "[s]ave, [r]etry extraction, [n]ew card, [q]uit: "
    } else {
        "[r]etry extraction, [n]ew card, [q]uit: "
    };
    loop {
        let Some(answer) = prompt(input, question).await? else {
            return Ok(ReviewChoice::Quit);
        };
        match answer.to_ascii_lowercase().as_str() {
            "s" if can_save => return Ok(ReviewChoice::Save),
            "r" => return Ok(ReviewChoice::Retry),
            "n" => return Ok(ReviewChoice::New),
            "q" => return Ok(ReviewChoice::Quit),
            _ => note_warn("Unknown choice"),
        }
    }
}

/// `None` on end of input.
async fn prompt<R>(input: &mut Lines<R>, question: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    print!("{question}");
    std::io::Write::flush(&mut std::io::stdout())?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

fn show_review(state: &ScanState) {
    if let Some(model) = &state.model_used {
        println!("{}", render_model_used(model));
    }
    if let Some(result) = &state.result {
        print!("{}", render_fields(&result.fields));
    }
}

fn show_camera_error(scanner: &mut Scanner) {
    if let Some(message) = scanner.snapshot().camera_error {
        note_error(&message);
    }
    scanner.dismiss_camera_error();
}

fn show_extraction_error(scanner: &mut Scanner) {
    if let Some(message) = scanner.snapshot().extraction_error {
        note_error(&message);
    }
    scanner.dismiss_extraction_error();
}

/// Print a line whenever a suspended step starts.
async fn report_progress(mut rx: watch::Receiver<ScanState>) {
    let mut last = rx.borrow().clone();
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if state.camera_opening && !last.camera_opening {
            note_info("Opening camera...");
        }
        if state.extracting && !last.extracting {
            note_info("Reading card...");
        }
        if state.saving && !last.saving {
            note_info("Saving...");
        }
        last = state;
    }
}
