/// Reverses the bit order of a raw sequence counter.
///
/// Sequential counters end up scattered across the whole 64-bit key space,
/// so consecutive inserts land on different key-range shards instead of
/// piling onto the tail of the table. The mapping is an involution:
/// `reverse(reverse(x)) == x` for every `x`.
///
/// # Example
/// ```
/// use revkey::reverse;
///
/// assert_eq!(reverse(1), 1 << 63);
/// assert_eq!(reverse(reverse(50_000)), 50_000);
/// ```
#[inline]
#[must_use]
pub const fn reverse(counter: u64) -> u64 {
    counter.reverse_bits()
}
