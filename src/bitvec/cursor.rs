//! Positional cursors over a BitVector

use super::BitVector;

/// Read-only cursor over the bits of a [`BitVector`].
///
/// A cursor is valid while its index is below `bits()`. Reading through an
/// invalid cursor panics, so check [`Cursor::valid`] first:
///
/// ```rust
/// use slabkit::BitVector;
///
/// let mut bv = BitVector::with_bits(16);
/// bv.set(2);
/// bv.set(9);
///
/// let mut seen = Vec::new();
/// let mut cursor = bv.first_set_cursor();
/// while cursor.valid() {
///     seen.push(cursor.index());
///     cursor.next_set();
/// }
/// assert_eq!(seen, vec![2, 9]);
/// ```
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    bits: &'a BitVector,
    index: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bits: &'a BitVector, index: usize) -> Self {
        Self { bits, index }
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.index < self.bits.bits()
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.bits.get(self.index)
    }

    /// Step to the next bit
    pub fn advance(&mut self) -> &mut Self {
        self.index = self.index.saturating_add(1);
        self
    }

    /// Step to the next set bit, or past the end
    pub fn next_set(&mut self) -> &mut Self {
        self.index = self.bits.next_set_from(self.index.saturating_add(1));
        self
    }

    /// Step to the next unset bit, or past the end
    pub fn next_unset(&mut self) -> &mut Self {
        self.index = self.bits.next_unset_from(self.index.saturating_add(1));
        self
    }
}

/// Cursor that can also write the bit it points at
pub struct CursorMut<'a> {
    bits: &'a mut BitVector,
    index: usize,
}

impl<'a> CursorMut<'a> {
    pub fn new(bits: &'a mut BitVector, index: usize) -> Self {
        Self { bits, index }
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.index < self.bits.bits()
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.bits.get(self.index)
    }

    pub fn advance(&mut self) -> &mut Self {
        self.index = self.index.saturating_add(1);
        self
    }

    pub fn next_set(&mut self) -> &mut Self {
        self.index = self.bits.next_set_from(self.index.saturating_add(1));
        self
    }

    pub fn next_unset(&mut self) -> &mut Self {
        self.index = self.bits.next_unset_from(self.index.saturating_add(1));
        self
    }

    pub fn set(&mut self) {
        self.bits.set(self.index);
    }

    pub fn unset(&mut self) {
        self.bits.unset(self.index);
    }

    pub fn set_to(&mut self, value: bool) {
        self.bits.set_to(self.index, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_walk() {
        let mut bv = BitVector::with_bits(4);
        bv.set(1);

        let mut cursor = bv.cursor(0);
        let mut pattern = Vec::new();
        while cursor.valid() {
            pattern.push(cursor.get());
            cursor.advance();
        }
        assert_eq!(pattern, vec![false, true, false, false]);
        assert_eq!(cursor.index(), 4);
    }

    #[test]
    fn test_cursor_next_unset() {
        let mut bv = BitVector::with_bits(8);
        for i in 0..5 {
            bv.set(i);
        }
        let mut cursor = bv.cursor(0);
        cursor.next_unset();
        assert_eq!(cursor.index(), 5);
        cursor.next_unset();
        assert_eq!(cursor.index(), 6);
    }

    #[test]
    fn test_first_set_cursor_on_empty_is_invalid() {
        let bv = BitVector::with_bits(100);
        assert!(!bv.first_set_cursor().valid());
        assert!(!bv.last_set_cursor().valid());
    }

    #[test]
    fn test_last_set_cursor() {
        let mut bv = BitVector::with_bits(100);
        bv.set(12);
        bv.set(88);
        let cursor = bv.last_set_cursor();
        assert!(cursor.valid());
        assert_eq!(cursor.index(), 88);
    }

    #[test]
    fn test_cursor_mut_writes() {
        let mut bv = BitVector::with_bits(6);
        {
            let mut cursor = bv.cursor_mut(0);
            while cursor.valid() {
                if cursor.index() % 2 == 0 {
                    cursor.set();
                }
                cursor.advance();
            }
        }
        assert_eq!(bv.to_string(), "101010");

        let mut cursor = bv.cursor_mut(0);
        cursor.next_set();
        assert_eq!(cursor.index(), 2);
        cursor.unset();
        cursor.set_to(false);
        assert!(!cursor.get());
        assert_eq!(bv.to_string(), "100010");
    }
}
