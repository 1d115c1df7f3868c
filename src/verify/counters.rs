//! Record counters
//!
//! Every counter reads its input once, front to back, without building the
//! records in memory.

use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::fmt;
use std::io::{self, Read};

const CHUNK_SIZE: usize = 64 * 1024;

// ============================================================================
// Line and CSV Counters
// ============================================================================

/// Count `\n` bytes, plus one when the input does not end with `\n`.
///
/// Empty input has zero lines.
pub fn count_lines<R: Read>(mut reader: R) -> io::Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut newlines = 0u64;
    let mut last = None;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        newlines += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
        last = Some(buf[n - 1]);
    }

    Ok(match last {
        None => 0,
        Some(b'\n') => newlines,
        Some(_) => newlines + 1,
    })
}

/// Count CSV records; a newline inside a quoted field does not end a record
pub fn count_csv_records<R: Read>(mut reader: R) -> io::Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut records = 0u64;
    let mut in_quotes = false;
    let mut last = None;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for &b in &buf[..n] {
            match b {
                // An escaped `""` toggles twice and leaves the state unchanged
                b'"' => in_quotes = !in_quotes,
                b'\n' if !in_quotes => records += 1,
                _ => {}
            }
        }
        last = Some(buf[n - 1]);
    }

    Ok(match last {
        None => 0,
        Some(b'\n') if !in_quotes => records,
        Some(_) => records + 1,
    })
}

// ============================================================================
// JSON Counters
// ============================================================================

/// Length of a top-level JSON array
pub fn count_json_array<R: Read>(reader: R) -> serde_json::Result<u64> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let count = ArrayLength.deserialize(&mut de)?;
    de.end()?;
    Ok(count)
}

/// Length of the array stored under `key` in a top-level JSON object.
///
/// Other members are skipped without being materialized.
pub fn count_json_collection<R: Read>(reader: R, key: &str) -> serde_json::Result<u64> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let count = CollectionLength { key }.deserialize(&mut de)?;
    de.end()?;
    count.ok_or_else(|| serde::de::Error::custom(format!("missing `{key}` array")))
}

/// Counts sequence elements, discarding each one
struct ArrayLength;

impl<'de> DeserializeSeed<'de> for ArrayLength {
    type Value = u64;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ArrayLength {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<u64, A::Error> {
        let mut count = 0;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

/// Finds one key in a map and counts the array under it
struct CollectionLength<'k> {
    key: &'k str,
}

impl<'de> DeserializeSeed<'de> for CollectionLength<'_> {
    type Value = Option<u64>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Option<u64>, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for CollectionLength<'_> {
    type Value = Option<u64>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a JSON object with a `{}` array", self.key)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Option<u64>, A::Error> {
        let mut found = None;
        while let Some(key) = map.next_key::<String>()? {
            if found.is_none() && key == self.key {
                found = Some(map.next_value_seed(ArrayLength)?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(found)
    }
}
