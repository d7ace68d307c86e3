use serde::{Deserialize, Serialize};

/// How [`Model::load`](crate::Model::load) treats a name file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Log per-package progress at `info` instead of `debug`.
    pub verbose: bool,
    /// Keep packages that fail to load as raw text instead of failing.
    pub forgive: bool,
    /// Run package checks after loading and log what they find.
    pub check: bool,
    /// Name-file types to load. DIS is always loaded; everything else not
    /// listed is dropped from the model.
    pub load_only: Option<Vec<String>>,
}

impl LoadOptions {
    pub fn forgiving() -> Self {
        Self {
            forgive: true,
            ..Self::default()
        }
    }

    pub fn with_load_only<I, S>(mut self, ftypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.load_only = Some(
            ftypes
                .into_iter()
                .map(|f| f.as_ref().to_ascii_uppercase())
                .collect(),
        );
        self
    }

    /// Whether `ftype` should be loaded.
    pub fn wants(&self, ftype: &str) -> bool {
        if ftype.eq_ignore_ascii_case("DIS") {
            return true;
        }
        match &self.load_only {
            Some(list) => list.iter().any(|f| f.eq_ignore_ascii_case(ftype)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_wanted_by_default() {
        let options = LoadOptions::default();
        assert!(options.wants("HOB"));
        assert!(options.wants("BAS6"));
    }

    #[test]
    fn load_only_keeps_dis() {
        let options = LoadOptions::default().with_load_only(["drob"]);
        assert!(options.wants("DROB"));
        assert!(options.wants("DIS"));
        assert!(!options.wants("HOB"));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let options: LoadOptions = serde_json::from_str(r#"{"forgive": true}"#).unwrap();
        assert_eq!(options, LoadOptions::forgiving());
    }
}
