use crate::error::Error;
use rand::Rng;
use std::convert::TryFrom;
use std::fmt;

/// Characters a short key is drawn from. Visually ambiguous characters
/// (I, O, 0, 1) are left out.
pub const KEY_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of every generated short key
pub const KEY_LEN: usize = 12;

/// A share link key, as handed out in urls
#[derive(PartialEq, Eq, Debug, Clone, Hash)]
pub struct ShortKey(String);

impl ShortKey {
    /// Draw a fresh key from the given rng
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> ShortKey {
        let key = (0..KEY_LEN)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect();
        ShortKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for ShortKey {
    type Error = Error;

    /// Keys that could never have been issued are rejected before any lookup
    fn try_from(key: &str) -> Result<ShortKey, Self::Error> {
        let well_formed =
            key.len() == KEY_LEN && key.bytes().all(|b| KEY_ALPHABET.contains(&b));
        if well_formed {
            Ok(ShortKey(key.to_string()))
        } else {
            Err(Error::LinkInvalid)
        }
    }
}

/// A source of candidate keys for minting
pub trait KeySource {
    fn next_key(&self) -> ShortKey;
}

/// Keys from the thread local rng
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeys;

impl KeySource for RandomKeys {
    fn next_key(&self) -> ShortKey {
        ShortKey::generate(&mut rand::thread_rng())
    }
}

/// Replays a fixed list of keys, then falls back to random ones. A test aid
/// for forcing key collisions, built only with the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    queue: std::cell::RefCell<std::collections::VecDeque<ShortKey>>,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedKeys {
    pub fn new<I>(keys: I) -> Result<ScriptedKeys, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let queue = keys
            .into_iter()
            .map(|k| ShortKey::try_from(k.as_ref()))
            .collect::<Result<std::collections::VecDeque<_>, _>>()?;
        Ok(ScriptedKeys {
            queue: std::cell::RefCell::new(queue),
        })
    }
}

#[cfg(any(test, feature = "test-util"))]
impl KeySource for ScriptedKeys {
    fn next_key(&self) -> ShortKey {
        self.queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| RandomKeys.next_key())
    }
}
