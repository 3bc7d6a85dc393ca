//! Deterministic space-id generation.
//!
//! Slot `i` (1-based) maps to `<section letter><2-digit number>` where the
//! letter advances every `section_size` slots starting at `A`. The generator
//! is pure, so reseeding the registry always produces the same ordered
//! sequence of ids.

/// A generated parking slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceSlot {
    pub id: String,
    pub section: char,
    pub number: u32,
}

/// Id for the 1-based slot `index`. `section_size` must be non-zero and the
/// index must stay within 26 sections; both are enforced by config validation.
pub fn space_id(index: u32, section_size: u32) -> String {
    let section = section_letter(index, section_size);
    let number = (index - 1) % section_size + 1;
    format!("{}{:02}", section, number)
}

fn section_letter(index: u32, section_size: u32) -> char {
    (b'A' + ((index - 1) / section_size) as u8) as char
}

/// Generate the full ordered registry for a lot.
pub fn generate(total_spaces: u32, section_size: u32) -> Vec<SpaceSlot> {
    (1..=total_spaces)
        .map(|i| SpaceSlot {
            id: space_id(i, section_size),
            section: section_letter(i, section_size),
            number: (i - 1) % section_size + 1,
        })
        .collect()
}
