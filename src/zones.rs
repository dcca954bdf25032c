//! Sorted, deduplicated zone-name table.
//!
//! Every polygon stores the index of its zone name in this table, so the table must be
//! complete before anything is encoded. The table is also the catalog the runtime reader
//! uses to turn a zone id back into a name; it is persisted with `bincode`.

use crate::error::{Error, Result};
use tracing::warn;

/// Sorted unique zone names. A zone id is an index into [`ZoneNameTable::names`].
#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ZoneNameTable {
    names: Vec<String>,
}

impl ZoneNameTable {
    /// Builds the table from names in input order.
    ///
    /// # Examples
    ///
    /// ```
    /// use tzgrid::zones::ZoneNameTable;
    ///
    /// let table = ZoneNameTable::from_names(["Europe/Berlin", "Asia/Tokyo", "Europe/Berlin"]);
    /// assert_eq!(table.names(), ["Asia/Tokyo", "Europe/Berlin"]);
    /// assert_eq!(table.id_of("Europe/Berlin"), Some(1));
    /// assert_eq!(table.name(0), Some("Asia/Tokyo"));
    /// ```
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();
        names.sort_unstable();
        names.dedup();
        Self { names }
    }

    /// All names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of distinct zones.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table holds no names.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name belonging to a zone id.
    pub fn name(&self, id: u16) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Zone id of a name, or `None` when the name is unknown or the id would not fit the
    /// 16-bit field of the binary format.
    pub fn id_of(&self, name: &str) -> Option<u16> {
        let idx = self.names.binary_search_by(|n| n.as_str().cmp(name)).ok()?;
        u16::try_from(idx).ok()
    }

    /// Fails with a capacity error when some id would not fit in 16 bits.
    pub fn check_capacity(&self) -> Result<()> {
        if self.names.len() > u16::MAX as usize + 1 {
            return Err(Error::capacity(format!(
                "{} distinct zone names, at most {} fit a 16-bit zone id",
                self.names.len(),
                u16::MAX as usize + 1
            )));
        }
        Ok(())
    }

    /// Names the IANA timezone database does not know (e.g. `uninhabited`).
    pub fn unknown_names(&self) -> Vec<&str> {
        self.names
            .iter()
            .map(String::as_str)
            .filter(|name| name.parse::<chrono_tz::Tz>().is_err())
            .collect()
    }

    /// Logs a warning for every name outside the IANA database.
    pub fn warn_unknown(&self) {
        for name in self.unknown_names() {
            warn!("zone name {:?} is not an IANA timezone", name);
        }
    }

    /// Encodes the catalog with the standard `bincode` configuration.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::encode_to_vec(self, bincode::config::standard())?)
    }

    /// Decodes a catalog produced by [`ZoneNameTable::encode`].
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (table, _): (Self, _) = bincode::decode_from_slice(data, bincode::config::standard())?;
        Ok(table)
    }

    /// Reads a catalog file.
    pub fn read_from(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::decode(&std::fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_sorted_order_not_input_order() {
        let table = ZoneNameTable::from_names(["b", "c", "a", "c"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.id_of("a"), Some(0));
        assert_eq!(table.id_of("b"), Some(1));
        assert_eq!(table.id_of("c"), Some(2));
        assert_eq!(table.id_of("d"), None);
        assert_eq!(table.name(3), None);
    }

    #[test]
    fn catalog_survives_bincode() {
        let table = ZoneNameTable::from_names(["Europe/Paris", "America/New_York", "uninhabited"]);
        let bytes = table.encode().unwrap();
        assert_eq!(ZoneNameTable::decode(&bytes).unwrap(), table);
    }

    #[test]
    fn flags_names_outside_the_iana_database() {
        let table = ZoneNameTable::from_names(["Europe/Paris", "uninhabited"]);
        assert_eq!(table.unknown_names(), vec!["uninhabited"]);
    }

    #[test]
    fn empty_table_fits() {
        let table = ZoneNameTable::default();
        assert!(table.is_empty());
        assert!(table.check_capacity().is_ok());
    }
}
