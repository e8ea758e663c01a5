use std::io::{self, Write};

use canary_alloc::Plain;

/// Copies one element into another slot. Supplied by the caller on `init`.
pub type CopyFn<T> = fn(&mut T, &T);

/// Per-element behavior the stack needs for copying, poisoning and dumping its slots.
pub trait Element: Plain {
    /// Plain assignment, suitable as the [`CopyFn`] handed to `init`.
    fn copy(dest: &mut Self, src: &Self) {
        *dest = *src;
    }

    /// Writes the element to `sink` and returns the number of characters written.
    fn print(&self, sink: &mut dyn Write) -> io::Result<usize>;

    /// Number of characters [`print`](Element::print) would write.
    fn length(&self) -> usize;

    /// Upper bound on [`length`](Element::length) over every value of the type.
    fn max_length() -> usize;

    /// The value written into slots that were never pushed to.
    fn poison() -> Self;

    fn is_poison(&self) -> bool;
}

fn decimal_length(value: i128) -> usize {
    let mut length = if value <= 0 { 1 } else { 0 };
    let mut rest = value.unsigned_abs();
    while rest > 0 {
        length += 1;
        rest /= 10;
    }
    length
}

macro_rules! integer_element {
    ($($ty:ty => $poison:expr, $max_length:expr);* $(;)?) => {
        $(
            impl Element for $ty {
                fn print(&self, sink: &mut dyn Write) -> io::Result<usize> {
                    write!(sink, "{}", self)?;
                    Ok(self.length())
                }

                fn length(&self) -> usize {
                    decimal_length(*self as i128)
                }

                fn max_length() -> usize {
                    $max_length
                }

                fn poison() -> Self {
                    $poison
                }

                fn is_poison(&self) -> bool {
                    *self == $poison
                }
            }
        )*
    };
}

integer_element! {
    i32 => 0xDED0_0DED_u32 as i32, 12;
    u32 => 0xDED0_0DED, 10;
    i64 => 0xDED0_0DED_DED0_0DED_u64 as i64, 20;
    u64 => 0xDED0_0DED_DED0_0DED, 20;
}

const F64_POISON: u64 = 0x7FF8_DED0_0DED_0DED;

impl Element for f64 {
    fn print(&self, sink: &mut dyn Write) -> io::Result<usize> {
        let text = format!("{:?}", self);
        sink.write_all(text.as_bytes())?;
        Ok(text.len())
    }

    fn length(&self) -> usize {
        format!("{:?}", self).len()
    }

    fn max_length() -> usize {
        // "-1.7976931348623157e308"
        24
    }

    fn poison() -> Self {
        f64::from_bits(F64_POISON)
    }

    // NaN never compares equal, so the bit pattern is what identifies poison.
    fn is_poison(&self) -> bool {
        self.to_bits() == F64_POISON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printed<T: Element>(value: T) -> String {
        let mut out = Vec::new();
        let written = value.print(&mut out).unwrap();
        assert_eq!(written, out.len());
        assert_eq!(written, value.length());
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn integer_length_matches_print() {
        assert_eq!(printed(0i32), "0");
        assert_eq!(printed(-7i32), "-7");
        assert_eq!(printed(1000i32), "1000");
        assert_eq!(printed(i32::MIN), "-2147483648");
        assert_eq!(printed(u64::MAX), "18446744073709551615");
        assert_eq!(printed(i64::MIN).len(), 20);
    }

    #[test]
    fn max_length_bounds_every_value() {
        assert!(i32::MIN.length() <= i32::max_length());
        assert!(u32::MAX.length() <= u32::max_length());
        assert!(i64::MIN.length() <= i64::max_length());
        assert!(u64::MAX.length() <= u64::max_length());
        assert!((-f64::MAX).length() <= f64::max_length());
        assert!(f64::MIN_POSITIVE.length() <= f64::max_length());
    }

    #[test]
    fn poison_is_recognized() {
        assert!(i32::poison().is_poison());
        assert!(!0i32.is_poison());
        assert!(u64::poison().is_poison());
        assert!(f64::poison().is_poison());
        assert!(!f64::NAN.is_poison());
        assert!(!1.5f64.is_poison());
    }

    #[test]
    fn default_copy_assigns() {
        let mut dest = 0i64;
        i64::copy(&mut dest, &-42);
        assert_eq!(dest, -42);
    }
}
