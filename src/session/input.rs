use std::io::BufRead;
use std::thread;

use futures_channel::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};

/// Lines from stdin, read on a helper thread so the runtime stays free for
/// autosave ticks while the user is typing.
pub fn stdin_lines() -> UnboundedReceiver<String> {
    let (sender, receiver) = mpsc::unbounded();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.unbounded_send(line).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    warn!("Failed to read input: {}", error);
                    break;
                }
            }
        }
        debug!("Stdin reader finished");
    });
    receiver
}
