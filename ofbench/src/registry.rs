//! # Algorithm registry
//!
//! The catalog of flow estimators is fixed. Its order is part of the command line contract:
//! algorithms are selected by their index, so it must never be re-sorted.

use crate::prelude::v1::*;
use std::fmt;
use std::str::FromStr;

/// Catalog entries, in selection order.
const CATALOG: [(&str, bool); 9] = [
    ("Dummy", true),
    ("DIS_Medium", true),
    ("DIS_Fast", true),
    ("DIS_UltraFast", true),
    ("Farneback", true),
    ("DenseRLOF", false),
    ("DualTVL1", true),
    ("PCAFlow", true),
    ("DeepFlow", true),
];

/// Index of the placeholder entry that has no estimator behind it.
const DUMMY: usize = 0;

/// Static description of a catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    pub index: usize,
    pub name: &'static str,
    pub requires_gray: bool,
}

impl AlgorithmDescriptor {
    fn from_index(index: usize) -> Option<Self> {
        CATALOG
            .get(index)
            .map(|&(name, requires_gray)| Self {
                index,
                name,
                requires_gray,
            })
    }

    /// Whether an estimator can be built for this entry.
    pub fn is_implemented(&self) -> bool {
        self.index != DUMMY
    }
}

/// Algorithm selector, either by catalog index or by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlgorithmId {
    Index(usize),
    Name(String),
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(n) => write!(f, "{n:?}"),
        }
    }
}

impl From<usize> for AlgorithmId {
    fn from(idx: usize) -> Self {
        Self::Index(idx)
    }
}

impl From<&str> for AlgorithmId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl FromStr for AlgorithmId {
    type Err = std::convert::Infallible;

    /// Digit strings select by index, anything else by name.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.parse::<usize>() {
            Ok(idx) if s.bytes().all(|b| b.is_ascii_digit()) => Self::Index(idx),
            _ => Self::Name(s.to_string()),
        })
    }
}

/// Constructs a live estimator for a catalog entry.
pub type EstimatorFactory =
    dyn Fn(&AlgorithmDescriptor) -> anyhow::Result<Box<dyn FlowEstimator>> + Send + Sync;

/// Resolves algorithm identifiers and builds estimators on demand.
///
/// The registry never holds live estimators. Each selection gets a fresh instance from the
/// backend factory.
pub struct Registry {
    factory: Box<EstimatorFactory>,
}

impl Registry {
    /// Create a registry backed by the given estimator factory.
    ///
    /// The factory is only ever called with implemented catalog entries.
    pub fn new(
        factory: impl Fn(&AlgorithmDescriptor) -> anyhow::Result<Box<dyn FlowEstimator>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
        }
    }

    /// Every catalog entry in order, including the placeholder.
    pub fn catalog(&self) -> impl Iterator<Item = AlgorithmDescriptor> {
        (0..CATALOG.len()).filter_map(AlgorithmDescriptor::from_index)
    }

    /// Catalog entries usable for a run, in order.
    pub fn list(&self) -> impl Iterator<Item = AlgorithmDescriptor> {
        self.catalog().filter(AlgorithmDescriptor::is_implemented)
    }

    /// Resolve an identifier to its descriptor.
    ///
    /// Identifiers outside the catalog, and the placeholder entry, are rejected with
    /// `Error::UnknownAlgorithm`.
    pub fn resolve(&self, id: &AlgorithmId) -> Result<AlgorithmDescriptor> {
        let desc = match id {
            AlgorithmId::Index(idx) => AlgorithmDescriptor::from_index(*idx),
            AlgorithmId::Name(name) => self.catalog().find(|d| d.name == name),
        };

        desc.filter(AlgorithmDescriptor::is_implemented)
            .ok_or_else(|| Error::UnknownAlgorithm(id.to_string()))
    }

    /// Build a fresh estimator for the descriptor.
    pub fn instantiate(&self, desc: &AlgorithmDescriptor) -> Result<Box<dyn FlowEstimator>> {
        if !desc.is_implemented() {
            return Err(Error::UnknownAlgorithm(desc.name.to_string()));
        }

        (self.factory)(desc).map_err(Error::Backend)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub struct ZeroEstimator;

    impl FlowEstimator for ZeroEstimator {
        fn calc(
            &mut self,
            _: &Frame,
            curr: &Frame,
            _: Option<&FlowField>,
        ) -> anyhow::Result<FlowField> {
            let (w, h) = curr.dim();
            Ok(FlowField::new(w, h))
        }
    }

    pub fn zero_registry() -> Registry {
        Registry::new(|_| Ok(Box::new(ZeroEstimator)))
    }

    #[test]
    fn grayscale_requirements() {
        let registry = zero_registry();

        let table = [
            ("DIS_Medium", true),
            ("DIS_Fast", true),
            ("DIS_UltraFast", true),
            ("Farneback", true),
            ("DenseRLOF", false),
            ("DualTVL1", true),
            ("PCAFlow", true),
            ("DeepFlow", true),
        ];

        for (idx, (name, gray)) in table.iter().enumerate() {
            let by_name = registry.resolve(&(*name).into()).unwrap();
            let by_index = registry.resolve(&(idx + 1).into()).unwrap();
            assert_eq!(by_name, by_index);
            assert_eq!(by_name.name, *name);
            assert_eq!(by_name.requires_gray, *gray, "{name}");
        }
    }

    #[test]
    fn dummy_and_unknown_rejected() {
        let registry = zero_registry();

        for id in [
            AlgorithmId::Index(0),
            AlgorithmId::Index(9),
            AlgorithmId::Index(100),
            "Dummy".into(),
            "dis_medium".into(),
            "".into(),
        ] {
            assert!(
                matches!(registry.resolve(&id), Err(Error::UnknownAlgorithm(_))),
                "{id}"
            );
        }
    }

    #[test]
    fn listing_skips_dummy_and_keeps_order() {
        let registry = zero_registry();

        let names: Vec<_> = registry.list().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "DIS_Medium",
                "DIS_Fast",
                "DIS_UltraFast",
                "Farneback",
                "DenseRLOF",
                "DualTVL1",
                "PCAFlow",
                "DeepFlow"
            ]
        );
        assert_eq!(registry.catalog().count(), CATALOG.len());
        assert_eq!(registry.catalog().next().map(|d| d.name), Some("Dummy"));
    }

    #[test]
    fn identifiers_parse() {
        assert_eq!("3".parse::<AlgorithmId>().unwrap(), AlgorithmId::Index(3));
        assert_eq!(
            "+3".parse::<AlgorithmId>().unwrap(),
            AlgorithmId::Name("+3".into())
        );
        assert_eq!(
            "Farneback".parse::<AlgorithmId>().unwrap(),
            AlgorithmId::Name("Farneback".into())
        );
    }

    #[test]
    fn instantiate_refuses_dummy() {
        let registry = zero_registry();
        let dummy = registry.catalog().next().unwrap();
        assert!(registry.instantiate(&dummy).is_err());

        let dis = registry.resolve(&AlgorithmId::Index(1)).unwrap();
        assert!(registry.instantiate(&dis).is_ok());
    }
}
