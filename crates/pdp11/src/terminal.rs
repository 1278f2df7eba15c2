use std::io::Read;
use std::sync::mpsc::{self, Receiver};
use std::thread;

const READ_CHUNK: usize = 64;

/// Host newline to the carriage return a PDP-11 terminal sends.
#[must_use]
pub const fn keyboard_byte(byte: u8) -> u8 {
    if byte == b'\n' {
        b'\r'
    } else {
        byte
    }
}

/// Reads `input` on a background thread and forwards each byte to the
/// returned receiver. The channel disconnects at end of input.
pub fn spawn_keyboard<R: Read + Send + 'static>(mut input: R) -> Receiver<u8> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new().name("keyboard".into()).spawn(move || {
        let mut buf = [0_u8; READ_CHUNK];
        loop {
            let n = match input.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    log::warn!("keyboard read failed: {err}");
                    break;
                }
            };
            for &byte in &buf[..n] {
                if tx.send(keyboard_byte(byte)).is_err() {
                    return;
                }
            }
        }
        log::debug!("keyboard input closed");
    });
    if let Err(err) = spawned {
        log::error!("cannot start keyboard thread: {err}");
    }
    rx
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{keyboard_byte, spawn_keyboard};

    #[test]
    fn forwards_bytes_until_eof() {
        let rx = spawn_keyboard(Cursor::new(b"ls\n".to_vec()));
        let received: Vec<u8> = rx.iter().collect();
        assert_eq!(received, b"ls\r");
    }

    #[test]
    fn other_bytes_pass_through() {
        assert_eq!(keyboard_byte(b'a'), b'a');
        assert_eq!(keyboard_byte(0o3), 0o3);
    }
}
