//! Scripted input for headless runs

use anyhow::{anyhow, bail, Context, Result};

/// One key transition due on a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedKey {
    pub frame: u32,
    pub code: u16,
    pub is_down: bool,
}

/// Key transitions sorted by frame. Entries for the same frame keep the
/// order they were given in.
#[derive(Debug, Default)]
pub struct KeyScript {
    keys: Vec<ScriptedKey>,
}

fn parse_hex_u16(s: &str) -> Result<u16> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).with_context(|| format!("bad scancode '{}'", s))
}

impl KeyScript {
    /// Parse `FRAME:CODE[:down|up]` entries. `CODE` is hex. Without a
    /// direction the entry expands to a press followed by a release.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.as_ref();
            let mut parts = entry.split(':');
            let frame = parts
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| anyhow!("empty key entry"))?
                .parse::<u32>()
                .with_context(|| format!("bad frame number in '{}'", entry))?;
            let code = parse_hex_u16(
                parts
                    .next()
                    .ok_or_else(|| anyhow!("missing scancode in '{}'", entry))?,
            )?;
            match parts.next() {
                None => {
                    keys.push(ScriptedKey {
                        frame,
                        code,
                        is_down: true,
                    });
                    keys.push(ScriptedKey {
                        frame,
                        code,
                        is_down: false,
                    });
                }
                Some("down") => keys.push(ScriptedKey {
                    frame,
                    code,
                    is_down: true,
                }),
                Some("up") => keys.push(ScriptedKey {
                    frame,
                    code,
                    is_down: false,
                }),
                Some(other) => bail!("bad direction '{}' in '{}'", other, entry),
            }
            if parts.next().is_some() {
                bail!("trailing fields in '{}'", entry);
            }
        }
        // Stable sort keeps same-frame order
        keys.sort_by_key(|k| k.frame);
        Ok(Self { keys })
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys due on `frame`, in order.
    pub fn due(&self, frame: u32) -> impl Iterator<Item = &ScriptedKey> + '_ {
        self.keys.iter().filter(move |k| k.frame == frame)
    }
}

/// Parse whitespace or comma separated hex bytes, e.g. `"16 12"` or `"0x17,0,0x80,1"`.
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            let digits = t.trim_start_matches("0x").trim_start_matches("0X");
            u8::from_str_radix(digits, 16).with_context(|| format!("bad byte '{}'", t))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_release_pair() {
        let script = KeyScript::parse(&["3:1C"]).unwrap();
        let keys: Vec<_> = script.due(3).copied().collect();
        assert_eq!(
            keys,
            vec![
                ScriptedKey {
                    frame: 3,
                    code: 0x1C,
                    is_down: true
                },
                ScriptedKey {
                    frame: 3,
                    code: 0x1C,
                    is_down: false
                },
            ]
        );
        assert_eq!(script.due(2).count(), 0);
    }

    #[test]
    fn test_explicit_directions_and_ordering() {
        let script = KeyScript::parse(&["5:0x12:up", "1:12:down", "5:1C:down"]).unwrap();
        assert_eq!(script.due(1).count(), 1);
        let frame5: Vec<_> = script.due(5).map(|k| (k.code, k.is_down)).collect();
        assert_eq!(frame5, vec![(0x12, false), (0x1C, true)]);
    }

    #[test]
    fn test_bad_entries() {
        assert!(KeyScript::parse(&[""]).is_err());
        assert!(KeyScript::parse(&["x:1C"]).is_err());
        assert!(KeyScript::parse(&["1"]).is_err());
        assert!(KeyScript::parse(&["1:ZZ"]).is_err());
        assert!(KeyScript::parse(&["1:1C:sideways"]).is_err());
        assert!(KeyScript::parse(&["1:1C:up:extra"]).is_err());
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!(parse_hex_bytes("16 12").unwrap(), vec![0x16, 0x12]);
        assert_eq!(
            parse_hex_bytes("0x17,0, 0x80 ,01").unwrap(),
            vec![0x17, 0x00, 0x80, 0x01]
        );
        assert!(parse_hex_bytes("").unwrap().is_empty());
        assert!(parse_hex_bytes("100").is_err());
    }
}
