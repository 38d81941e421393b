//! Keyword classifiers — pure substring inference from free text.
//!
//! Both tables are immutable configuration data. Declaration order is
//! load-bearing: genre tags are emitted in table order, and skill
//! inference short-circuits on the first matching level.

use attune_core::catalog::SkillLevel;

/// Genre keyword table, one entry per recognised genre.
pub const GENRE_KEYWORDS: &[(&str, &[&str])] = &[
  ("techno", &["techno", "tech house", "minimal", "industrial"]),
  ("house", &["house", "deep house", "progressive house", "tech house"]),
  ("hip-hop", &["hip hop", "hip-hop", "rap", "trap", "boom bap", "drill"]),
  ("trap", &["trap", "808", "drill"]),
  ("rnb", &["rnb", "r&b", "soul", "neo soul"]),
  ("pop", &["pop", "dance pop", "electro pop"]),
  ("edm", &["edm", "electronic", "dance", "festival"]),
  ("lo-fi", &["lofi", "lo-fi", "chillhop", "chill"]),
  ("ambient", &["ambient", "atmospheric", "soundscape"]),
  ("drum-and-bass", &["drum and bass", "dnb", "jungle"]),
  ("dubstep", &["dubstep", "bass music", "riddim"]),
  ("reggaeton", &["reggaeton", "latin", "dembow"]),
  ("afrobeat", &["afrobeat", "afro", "amapiano"]),
];

/// Skill keyword table. First matching level wins.
pub const SKILL_KEYWORDS: &[(SkillLevel, &[&str])] = &[
  (SkillLevel::Beginner, &[
    "beginner", "basic", "intro", "starter", "first", "learn", "101",
  ]),
  (SkillLevel::Intermediate, &["intermediate", "mid-level", "improving"]),
  (SkillLevel::Advanced, &[
    "advanced", "pro", "master", "expert", "professional",
  ]),
];

/// Emit `genre:<g>` for every genre with a keyword appearing as a
/// substring of the lowercased input, in table order.
pub fn infer_genres(text: &str) -> Vec<String> {
  let lower = text.to_lowercase();
  GENRE_KEYWORDS
    .iter()
    .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
    .map(|(genre, _)| format!("genre:{genre}"))
    .collect()
}

/// The first declared skill level with any keyword appearing as a
/// substring of the lowercased input.
pub fn infer_skill_level(text: &str) -> Option<SkillLevel> {
  let lower = text.to_lowercase();
  SKILL_KEYWORDS
    .iter()
    .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
    .map(|(level, _)| *level)
}
