//! Output names for containers and sub-sounds.

use std::{collections::HashSet, path::Path};

/// Replaces characters that are not allowed in file names with `_`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_ascii_control() => '_',
            c => c,
        })
        .collect()
}

/// Hands out names that are unique (ignoring case) among everything it has handed out before.
///
/// Every parent node in the result tree gets its own resolver.
#[derive(Debug, Default)]
pub struct NameResolver {
    taken: HashSet<String>,
}

impl NameResolver {
    /// Creates a resolver with no names taken.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a bank's containers should be flattened into the bank itself.
    ///
    /// That is the case only for a single container holding more than one sub-sound. A single
    /// container with a single sub-sound is still grouped.
    #[must_use]
    pub fn is_inline(container_count: usize, first_sub_sound_count: u32) -> bool {
        container_count == 1 && first_sub_sound_count > 1
    }

    /// Names the containers found in one bank, in discovery order.
    ///
    /// A container is named after its internal name, or after the bank if it has none. The
    /// second and later unnamed containers get `_2`, `_3`, ... so they do not all collide.
    pub fn container_names<'a>(
        &mut self,
        bank_stem: &str,
        internal_names: impl IntoIterator<Item = Option<&'a str>>,
    ) -> Vec<String> {
        let mut unnamed = 0;

        internal_names
            .into_iter()
            .map(|name| {
                let stem = name
                    .and_then(|name| Path::new(name).file_stem())
                    .map(|stem| stem.to_string_lossy())
                    .filter(|stem| !stem.is_empty());

                let base = match stem {
                    Some(stem) => stem.into_owned(),
                    None => {
                        unnamed += 1;
                        if unnamed == 1 {
                            bank_stem.to_owned()
                        } else {
                            format!("{bank_stem}_{unnamed}")
                        }
                    }
                };

                self.claim(&sanitize_file_name(&base), ".fsb")
            })
            .collect()
    }

    /// Claims `stem` + `extension`, appending `_1`, `_2`, ... to the stem if it is taken.
    pub fn claim(&mut self, stem: &str, extension: &str) -> String {
        let mut candidate = format!("{stem}{extension}");

        for n in 1.. {
            if self.taken.insert(candidate.to_lowercase()) {
                break;
            }
            candidate = format!("{stem}_{n}{extension}");
        }

        candidate
    }
}
