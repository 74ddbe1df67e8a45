//! Label codec: deterministic identifier → 3-word label mapping.
//!
//! DESIGN
//! ======
//! A 16-byte identifier is split into three contiguous segments of 5, 5 and 6
//! bytes. Each segment is XOR-folded to a single byte, which indexes a fixed
//! 256-entry dictionary. Labels are many-to-one (about 1 in 16.7M collide) and
//! are only a convenience for the model; resolution always falls back to the
//! full identifier and treats shared labels as ambiguous.

use uuid::Uuid;

const SEGMENTS: usize = 3;

#[rustfmt::skip]
const WORDS: [&str; 256] = [
    "acorn", "acre", "alpine", "amber", "anchor", "apple", "arrow", "aspen",
    "atlas", "autumn", "badge", "bagel", "bamboo", "banjo", "barley", "basil",
    "beacon", "beaver", "berry", "birch", "bison", "blade", "bloom", "bluff",
    "bonsai", "border", "bottle", "boulder", "branch", "breeze", "brick", "bridge",
    "brook", "bubble", "bucket", "buffalo", "button", "cabin", "cactus", "camel",
    "candle", "canoe", "canyon", "carbon", "carpet", "castle", "cedar", "cellar",
    "cherry", "chess", "cider", "cinder", "circle", "citrus", "clay", "cliff",
    "clover", "cobalt", "cobra", "comet", "copper", "coral", "cotton", "cougar",
    "crane", "crater", "crystal", "cypress", "dahlia", "daisy", "delta", "desert",
    "dingo", "dolphin", "donkey", "dove", "dragon", "drum", "dune", "eagle",
    "echo", "elm", "ember", "emerald", "falcon", "feather", "fennel", "fern",
    "ferry", "fiddle", "fig", "finch", "flint", "forest", "fossil", "fountain",
    "fox", "galaxy", "garden", "garnet", "gazelle", "geyser", "ginger", "glacier",
    "globe", "goose", "granite", "grape", "gravel", "harbor", "hawk", "hazel",
    "heron", "hickory", "hollow", "honey", "horizon", "hornet", "husky", "iceberg",
    "igloo", "indigo", "iris", "island", "ivory", "jackal", "jade", "jaguar",
    "jasmine", "jelly", "jungle", "juniper", "kayak", "kelp", "kernel", "kettle",
    "kiwi", "koala", "ladder", "lagoon", "lantern", "larch", "lemon", "lilac",
    "lily", "linen", "lizard", "lobster", "lotus", "lunar", "lynx", "magnet",
    "mango", "maple", "marble", "meadow", "melon", "meteor", "mint", "mirror",
    "mist", "monsoon", "moose", "mosaic", "moss", "nectar", "needle", "nickel",
    "nutmeg", "oak", "oasis", "ocean", "olive", "onyx", "orbit", "orchid",
    "osprey", "otter", "oyster", "paddle", "panda", "panther", "paper", "parrot",
    "pebble", "pelican", "pepper", "pigeon", "pine", "planet", "plum", "pollen",
    "pony", "poplar", "prairie", "prism", "puffin", "pumpkin", "quail", "quartz",
    "quill", "rabbit", "radish", "rain", "raven", "reef", "ribbon", "river",
    "robin", "rocket", "rose", "ruby", "saddle", "saffron", "salmon", "sapphire",
    "scarlet", "seal", "sequoia", "shadow", "shell", "silver", "sled", "sparrow",
    "spruce", "squid", "stone", "storm", "summit", "sunset", "swan", "tablet",
    "tango", "thistle", "thunder", "tiger", "timber", "topaz", "tulip", "tundra",
    "turtle", "umber", "valley", "velvet", "violet", "walnut", "walrus", "willow",
    "winter", "wolf", "wren", "yarrow", "yucca", "zebra", "zenith", "zephyr",
];

/// Label for a board object identifier.
#[must_use]
pub fn uuid_to_label(id: &Uuid) -> String {
    bytes_to_label(id.as_bytes())
}

/// Label for an identifier given as text, with or without dashes.
///
/// Returns `None` when the text is not a 32-digit hex identifier.
#[must_use]
pub fn label_for(raw: &str) -> Option<String> {
    let compact: String = raw.trim().chars().filter(|c| *c != '-').collect();
    if compact.len() != 32 {
        return None;
    }
    match Uuid::try_parse(&compact) {
        Ok(id) => Some(uuid_to_label(&id)),
        Err(_) => None,
    }
}

/// Fold each segment of `bytes` to one byte and join the matching words.
#[must_use]
pub fn bytes_to_label(bytes: &[u8]) -> String {
    let base = bytes.len() / SEGMENTS;
    let mut words = Vec::with_capacity(SEGMENTS);
    for segment in 0..SEGMENTS {
        let start = segment * base;
        // Last segment absorbs the remainder.
        let end = if segment == SEGMENTS - 1 { bytes.len() } else { start + base };
        let folded = bytes[start..end].iter().fold(0u8, |acc, b| acc ^ b);
        words.push(WORDS[usize::from(folded)]);
    }
    words.join(" ")
}

/// Canonical form used when comparing a user-supplied label to a computed one.
#[must_use]
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "label_test.rs"]
mod tests;
