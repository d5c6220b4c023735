mod profile;

pub use profile::{append_stanza, get_export, remove_export, set_export};
