//! Minimal VDU byte stream decoder
//!
//! Only the commands the reference VDP acts on are decoded:
//!
//! - `12`            clear screen
//! - `22, n`         select screen mode `n`
//! - `23, 0, 0x80, n` general poll, echoed back to the host
//!
//! Anything else comes out as [`VduCommand::Unhandled`].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VduCommand {
    ClearScreen,
    SetMode(u8),
    GeneralPoll(u8),
    Unhandled(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expecting {
    ModeNumber,
    SystemCommand,
    SystemSubCommand,
    PollValue,
}

#[derive(Debug, Default)]
pub struct VduDecoder {
    expecting: Option<Expecting>,
}

impl VduDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a multi-byte command is half received
    pub fn in_command(&self) -> bool {
        self.expecting.is_some()
    }

    /// Feed one byte. Returns a command once one is complete.
    pub fn push(&mut self, byte: u8) -> Option<VduCommand> {
        if let Some(expecting) = self.expecting.take() {
            return match (expecting, byte) {
                (Expecting::ModeNumber, n) => Some(VduCommand::SetMode(n)),
                (Expecting::SystemCommand, 0) => {
                    self.expecting = Some(Expecting::SystemSubCommand);
                    None
                }
                (Expecting::SystemCommand, _) => Some(VduCommand::Unhandled(23)),
                (Expecting::SystemSubCommand, 0x80) => {
                    self.expecting = Some(Expecting::PollValue);
                    None
                }
                (Expecting::SystemSubCommand, _) => Some(VduCommand::Unhandled(23)),
                (Expecting::PollValue, n) => Some(VduCommand::GeneralPoll(n)),
            };
        }

        match byte {
            12 => Some(VduCommand::ClearScreen),
            22 => {
                self.expecting = Some(Expecting::ModeNumber);
                None
            }
            23 => {
                self.expecting = Some(Expecting::SystemCommand);
                None
            }
            other => Some(VduCommand::Unhandled(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(bytes: &[u8]) -> Vec<VduCommand> {
        let mut dec = VduDecoder::new();
        bytes.iter().filter_map(|&b| dec.push(b)).collect()
    }

    #[test]
    fn test_clear_and_mode() {
        assert_eq!(
            feed(&[12, 22, 8, 12]),
            vec![
                VduCommand::ClearScreen,
                VduCommand::SetMode(8),
                VduCommand::ClearScreen
            ]
        );
    }

    #[test]
    fn test_mode_number_may_be_any_byte() {
        // 12 here is the mode argument, not a clear
        assert_eq!(feed(&[22, 12]), vec![VduCommand::SetMode(12)]);
    }

    #[test]
    fn test_general_poll() {
        assert_eq!(
            feed(&[23, 0, 0x80, 0x5A]),
            vec![VduCommand::GeneralPoll(0x5A)]
        );
    }

    #[test]
    fn test_other_system_commands_unhandled() {
        assert_eq!(feed(&[23, 1]), vec![VduCommand::Unhandled(23)]);
        assert_eq!(feed(&[23, 0, 0x81]), vec![VduCommand::Unhandled(23)]);
    }

    #[test]
    fn test_partial_command_state() {
        let mut dec = VduDecoder::new();
        assert_eq!(dec.push(22), None);
        assert!(dec.in_command());
        assert_eq!(dec.push(3), Some(VduCommand::SetMode(3)));
        assert!(!dec.in_command());
        assert_eq!(dec.push(b'A'), Some(VduCommand::Unhandled(b'A')));
    }
}
