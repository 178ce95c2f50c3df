//! hydrolog main entrypoint.

use hydrolog::run;
use hydrolog::ui::messages::error;

fn main() {
    if let Err(e) = run() {
        error(&e);
        std::process::exit(1);
    }
}
