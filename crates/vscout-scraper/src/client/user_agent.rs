use rand::seq::IndexedRandom;
use rand::Rng;

pub(crate) const BROWSER_FALLBACK_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Pick one user-agent from `pool` using the caller's random source.
///
/// An empty pool yields a fixed desktop browser UA.
pub fn pick_user_agent<'a, R: Rng + ?Sized>(pool: &'a [String], rng: &mut R) -> &'a str {
    pool.choose(rng).map_or(BROWSER_FALLBACK_UA, String::as_str)
}
