//! Bit-pattern templates used to declare opcode and reg-field bindings.
//!
//! A template is written most-significant bit first using `0` and `1` for
//! fixed bits, `*` for a wildcard and `_` as a visual separator, e.g.
//! `"1000_00**"` for the four group-1 immediate opcodes 0x80-0x83. Opcode
//! templates carry 8 bit positions, reg-field templates carry 3.

use crate::error::ConfigError;

/// Bit positions in an opcode template
pub const OPCODE_BITS: usize = 8;
/// Bit positions in a reg-field template
pub const REG_BITS: usize = 3;

/// A compiled template: its width and every concrete value it denotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub bits: usize,
    pub values: Vec<u8>,
}

impl Pattern {
    /// Compile a template into the `2^k` values it matches (k = wildcards)
    pub fn compile(template: &str) -> Result<Self, ConfigError> {
        let mut digits: Vec<char> = Vec::with_capacity(OPCODE_BITS);
        for ch in template.chars() {
            match ch {
                '_' => {}
                '0' | '1' | '*' => digits.push(ch),
                other => {
                    return Err(ConfigError::PatternChar {
                        pattern: template.to_string(),
                        ch: other,
                    })
                }
            }
        }

        let bits = digits.len();
        if bits != REG_BITS && bits != OPCODE_BITS {
            return Err(ConfigError::PatternLength {
                pattern: template.to_string(),
                found: bits,
            });
        }

        let mut fixed: u8 = 0;
        let mut wildcards: Vec<usize> = Vec::new();
        for (i, ch) in digits.iter().enumerate() {
            let pos = bits - 1 - i;
            match ch {
                '1' => fixed |= 1 << pos,
                '*' => wildcards.push(pos),
                _ => {}
            }
        }

        let combinations = 1u32 << wildcards.len();
        let mut values = Vec::with_capacity(combinations as usize);
        for assignment in 0..combinations {
            let mut value = fixed;
            for (i, pos) in wildcards.iter().enumerate() {
                if assignment & (1 << i) != 0 {
                    value |= 1 << pos;
                }
            }
            values.push(value);
        }

        Ok(Self { bits, values })
    }

    /// Compile and require a specific width
    pub fn compile_width(template: &str, bits: usize) -> Result<Self, ConfigError> {
        let pattern = Self::compile(template)?;
        if pattern.bits != bits {
            return Err(ConfigError::PatternWidth {
                pattern: template.to_string(),
                expected: bits,
                found: pattern.bits,
            });
        }
        Ok(pattern)
    }

    /// Render a value as the fixed-width bit string it stands for
    pub fn bit_string(&self, value: u8) -> String {
        format!("{:0width$b}", value, width = self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fixed_template() {
        let p = Pattern::compile("1001_0000").expect("valid");
        assert_eq!(p.bits, 8);
        assert_eq!(p.values, vec![0x90]);
    }

    #[test]
    fn test_wildcards_expand_exhaustively() {
        let p = Pattern::compile("1011_****").expect("valid");
        assert_eq!(p.values.len(), 16);
        let set: HashSet<u8> = p.values.iter().copied().collect();
        assert_eq!(set.len(), 16);
        for v in 0xB0..=0xBF {
            assert!(set.contains(&v), "missing {:02X}", v);
        }
    }

    #[test]
    fn test_scattered_wildcards() {
        // 00***0** covers the r/m forms of all eight ALU ops
        let p = Pattern::compile("00***0**").expect("valid");
        assert_eq!(p.values.len(), 32);
        let set: HashSet<u8> = p.values.iter().copied().collect();
        for op in 0u8..8 {
            for low in 0u8..4 {
                assert!(set.contains(&(op << 3 | low)));
            }
        }
        assert!(!set.contains(&0x04));
        assert!(!set.contains(&0x26));
    }

    #[test]
    fn test_every_assignment_appears_once() {
        let p = Pattern::compile("*1*0_1*0*").expect("valid");
        assert_eq!(p.values.len(), 16);
        let strings: HashSet<String> = p.values.iter().map(|&v| p.bit_string(v)).collect();
        assert_eq!(strings.len(), 16);
        for s in &strings {
            let b: Vec<char> = s.chars().collect();
            assert_eq!(b.len(), 8);
            assert_eq!((b[1], b[3], b[4], b[6]), ('1', '0', '1', '0'));
        }
    }

    #[test]
    fn test_reg_templates() {
        let p = Pattern::compile("***").expect("valid");
        assert_eq!(p.bits, 3);
        let mut v = p.values.clone();
        v.sort_unstable();
        assert_eq!(v, (0..8).collect::<Vec<u8>>());

        let p = Pattern::compile("1_0_1").expect("valid");
        assert_eq!(p.values, vec![5]);
    }

    #[test]
    fn test_rejects_bad_lengths() {
        for bad in ["", "10", "1010", "1010_1010_1", "**_**"] {
            assert!(
                matches!(
                    Pattern::compile(bad),
                    Err(ConfigError::PatternLength { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_bad_characters() {
        let err = Pattern::compile("1010_10x0").unwrap_err();
        assert!(matches!(err, ConfigError::PatternChar { ch: 'x', .. }));
        assert!(Pattern::compile("1010 1010").is_err());
    }

    #[test]
    fn test_width_requirement() {
        assert!(Pattern::compile_width("***", OPCODE_BITS).is_err());
        assert!(Pattern::compile_width("***", REG_BITS).is_ok());
    }
}
