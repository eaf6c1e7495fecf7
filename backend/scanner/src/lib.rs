pub mod scanner;
pub mod state;

pub use scanner::Scanner;
pub use state::{ScanPhase, ScanState};
