//! Table definitions for redb storage.
//!
//! All tables use byte arrays as keys and values. Key encoding is handled
//! by the keys module; values in the index table are always empty because
//! every component of an entry is packed into its key.

use redb::TableDefinition;

/// Table definitions for JotDB storage.
pub struct Tables;

impl Tables {
    /// Primary document storage: document id → canonical JSON bytes.
    ///
    /// Lives in the primary store file (`<name>`).
    pub const DOCUMENTS: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("documents");

    /// Index entries, both namespaces: packed key → empty.
    ///
    /// Lives in the index store file (`<name>.index`). The leading byte of
    /// each key selects the namespace:
    /// - Inverted (`'i'`): `i 00 {path} 00 {tagged_value} 00 {doc_id}`
    /// - Forward (`'f'`): `f 00 {doc_id} 00 {path} 00 {tagged_value}`
    pub const INDEX: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("index");
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::TableHandle;

    #[test]
    fn test_table_names_unique() {
        assert_ne!(Tables::DOCUMENTS.name(), Tables::INDEX.name());
    }
}
