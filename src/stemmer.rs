//! Indonesian affix-stripping stemmer.
//!
//! Dictionary-checked stripping in the usual order for Indonesian morphology:
//! inflectional particles (`-lah`, `-kah`, `-tah`, `-pun`), possessive
//! pronouns (`-nya`, `-ku`, `-mu`), derivational suffixes (`-kan`, `-an`, `-i`),
//! then up to three prefixes with the `me-`/`pe-` sound changes
//! (`meng-` → `k`, `meny-` → `s`, `mem-` → `p`, `men-` → `t`).
//!
//! A reduction is only accepted when it lands on a known root. Anything else
//! comes back unchanged, so an unknown word is never mangled.

use std::collections::HashSet;

const PARTICLES: [&str; 4] = ["lah", "kah", "tah", "pun"];
const POSSESSIVES: [&str; 3] = ["nya", "ku", "mu"];
const DERIVATIONAL: [&str; 3] = ["kan", "an", "i"];
const PLAIN_PREFIXES: [&str; 7] = ["di", "ke", "se", "ter", "ber", "per", "be"];

/// Words at or below this length are never stripped.
const MIN_STEMMABLE_CHARS: usize = 3;
/// Shortest root a strip may produce.
const MIN_ROOT_CHARS: usize = 2;
const MAX_PREFIX_DEPTH: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct Stemmer {
    roots: HashSet<String>,
}

impl Stemmer {
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn is_root(&self, word: &str) -> bool {
        self.roots.contains(word)
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Reduce `word` (expected lowercase) to its root, or return it unchanged.
    pub fn stem(&self, word: &str) -> String {
        if word.chars().count() <= MIN_STEMMABLE_CHARS
            || self.is_root(word)
            || !word.chars().all(char::is_alphabetic)
        {
            return word.to_string();
        }

        // Inflectional layers, outermost first: word, word-particle, word-particle-possessive.
        let mut bases = vec![word];
        let mut current = word;
        for group in [&PARTICLES[..], &POSSESSIVES[..]] {
            if let Some(rest) = strip_any_suffix(current, group) {
                current = rest;
                bases.push(current);
            }
        }

        for base in bases.iter().rev() {
            if self.is_root(base) {
                return base.to_string();
            }
            for variant in derivational_variants(base) {
                if self.is_root(variant) {
                    return variant.to_string();
                }
                if let Some(root) = self.strip_prefixes(variant, 0) {
                    return root;
                }
            }
        }

        word.to_string()
    }

    fn strip_prefixes(&self, word: &str, depth: usize) -> Option<String> {
        if depth >= MAX_PREFIX_DEPTH {
            return None;
        }
        for candidate in prefix_candidates(word) {
            if candidate.chars().count() < MIN_ROOT_CHARS {
                continue;
            }
            if self.is_root(&candidate) {
                return Some(candidate);
            }
            if let Some(root) = self.strip_prefixes(&candidate, depth + 1) {
                return Some(root);
            }
        }
        None
    }
}

fn strip_any_suffix<'a>(word: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|s| {
        word.strip_suffix(*s)
            .filter(|rest| rest.chars().count() >= MIN_ROOT_CHARS)
    })
}

/// `word` itself followed by each derivational-suffix strip that applies.
fn derivational_variants(word: &str) -> Vec<&str> {
    let mut out = vec![word];
    for suffix in DERIVATIONAL {
        if let Some(rest) = word.strip_suffix(suffix) {
            if rest.chars().count() >= MIN_ROOT_CHARS {
                out.push(rest);
            }
        }
    }
    out
}

fn starts_with_vowel(s: &str) -> bool {
    matches!(s.chars().next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

fn prefix_candidates(word: &str) -> Vec<String> {
    let mut out = Vec::new();

    for p in PLAIN_PREFIXES {
        if let Some(rest) = word.strip_prefix(p) {
            out.push(rest.to_string());
        }
    }

    for p in ["me", "pe"] {
        let Some(rest) = word.strip_prefix(p) else {
            continue;
        };
        if let Some(r) = rest.strip_prefix("ng") {
            // mengirim -> kirim, mengambil -> ambil
            out.push(r.to_string());
            if starts_with_vowel(r) {
                out.push(format!("k{r}"));
            }
        } else if let Some(r) = rest.strip_prefix("ny") {
            // menyesal -> sesal
            out.push(format!("s{r}"));
        } else if let Some(r) = rest.strip_prefix('m') {
            // membeli -> beli, memakai -> pakai
            out.push(r.to_string());
            if starts_with_vowel(r) {
                out.push(format!("p{r}"));
            }
        } else if let Some(r) = rest.strip_prefix('n') {
            // mendapat -> dapat, menulis -> tulis
            out.push(r.to_string());
            if starts_with_vowel(r) {
                out.push(format!("t{r}"));
            }
        } else {
            // melihat -> lihat, pelayan -> layan
            out.push(rest.to_string());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stemmer() -> Stemmer {
        Stemmer::new([
            "kirim", "layan", "sesal", "beli", "pakai", "tulis", "dapat", "lihat", "kecewa",
            "barang", "bagus", "kualitas", "lambat", "sampai", "ambil",
        ])
    }

    #[test]
    fn strips_possessive_and_particle() {
        let s = stemmer();
        assert_eq!(s.stem("barangnya"), "barang");
        assert_eq!(s.stem("bagusnyalah"), "bagus");
    }

    #[test]
    fn strips_confix_with_sound_change() {
        let s = stemmer();
        assert_eq!(s.stem("pengiriman"), "kirim");
        assert_eq!(s.stem("pelayanan"), "layan");
        assert_eq!(s.stem("menyesal"), "sesal");
        assert_eq!(s.stem("memakai"), "pakai");
        assert_eq!(s.stem("menulis"), "tulis");
        assert_eq!(s.stem("mengecewakan"), "kecewa");
        assert_eq!(s.stem("mengambil"), "ambil");
    }

    #[test]
    fn strips_plain_prefixes() {
        let s = stemmer();
        assert_eq!(s.stem("berkualitas"), "kualitas");
        assert_eq!(s.stem("terlambat"), "lambat");
        assert_eq!(s.stem("dikirim"), "kirim");
    }

    #[test]
    fn unknown_words_and_roots_pass_through() {
        let s = stemmer();
        assert_eq!(s.stem("sampai"), "sampai");
        assert_eq!(s.stem("xyzkan"), "xyzkan");
        assert_eq!(s.stem("ok"), "ok");
        assert_eq!(s.stem("😍"), "😍");
        assert_eq!(s.stem("100ml"), "100ml");
    }
}
