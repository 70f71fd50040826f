use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(make_chunk(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }

    if let Some(prev) = in_digits {
        out.push(make_chunk(&s[start..], prev));
    }
    out
}

fn make_chunk(s: &str, digits: bool) -> Chunk<'_> {
    match digits {
        true => Chunk::Digits(s),
        false => Chunk::Text(s),
    }
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');

    // equal length digit strings without leading zeros compare lexically
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        // "007" after "07" after "7"
        .then_with(|| a.len().cmp(&b.len()))
}

/// Compare two identifiers in natural order.
///
/// Digit runs compare by integer value, so `frame_2` sorts before
/// `frame_10`. Everything else compares character by character.
///
/// Example:
///
/// ```
/// use std::cmp::Ordering;
/// use freefall_scale::natural::natural_cmp;
///
/// assert_eq!(natural_cmp("frame_2", "frame_10"), Ordering::Less);
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let chunks_a = chunks(a);
    let chunks_b = chunks(b);

    for (ca, cb) in chunks_a.iter().zip(chunks_b.iter()) {
        let ord = match (ca, cb) {
            (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
            // digits sort before text, as in a plain byte comparison
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    chunks_a.len().cmp(&chunks_b.len())
}

/// Sort items in place by the natural order of a string key. The sort is stable.
pub fn natural_sort_by_key<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| natural_cmp(key(a), key(b)));
}
