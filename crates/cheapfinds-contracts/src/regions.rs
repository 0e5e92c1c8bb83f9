use indexmap::IndexMap;

pub const GLOBAL_REGION: &str = "Global";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub iso: String,
}

impl Region {
    pub fn is_global(&self) -> bool {
        self.name == GLOBAL_REGION
    }
}

/// Destination regions offered to the user, keyed by lowercase ISO code.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    regions: IndexMap<String, Region>,
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RegionRegistry {
    pub fn new(regions: Option<IndexMap<String, Region>>) -> Self {
        Self {
            regions: regions.unwrap_or_else(default_regions),
        }
    }

    pub fn get(&self, iso: &str) -> Option<&Region> {
        self.regions.get(&iso.trim().to_ascii_lowercase())
    }

    pub fn list(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn global(&self) -> Region {
        self.get("global").cloned().unwrap_or_else(|| Region {
            name: GLOBAL_REGION.to_string(),
            iso: "global".to_string(),
        })
    }

    /// Looks a region up by ISO code or by name, ignoring case. Unknown input
    /// resolves to `Global`.
    pub fn resolve(&self, input: &str) -> Region {
        let needle = input.trim();
        if needle.is_empty() {
            return self.global();
        }
        if let Some(region) = self.get(needle) {
            return region.clone();
        }
        self.regions
            .values()
            .find(|region| region.name.eq_ignore_ascii_case(needle))
            .cloned()
            .unwrap_or_else(|| self.global())
    }
}

const DEFAULT_REGIONS: &[(&str, &str)] = &[
    ("Global", "global"),
    ("Argentina", "ar"),
    ("Australia", "au"),
    ("Austria", "at"),
    ("Belgium", "be"),
    ("Brazil", "br"),
    ("Canada", "ca"),
    ("China", "cn"),
    ("Denmark", "dk"),
    ("Egypt", "eg"),
    ("Finland", "fi"),
    ("France", "fr"),
    ("Germany", "de"),
    ("Greece", "gr"),
    ("Hong Kong", "hk"),
    ("India", "in"),
    ("Indonesia", "id"),
    ("Ireland", "ie"),
    ("Israel", "il"),
    ("Italy", "it"),
    ("Japan", "jp"),
    ("Malaysia", "my"),
    ("Mexico", "mx"),
    ("Netherlands", "nl"),
    ("New Zealand", "nz"),
    ("Nigeria", "ng"),
    ("Norway", "no"),
    ("Philippines", "ph"),
    ("Poland", "pl"),
    ("Portugal", "pt"),
    ("Russia", "ru"),
    ("Saudi Arabia", "sa"),
    ("Singapore", "sg"),
    ("South Africa", "za"),
    ("South Korea", "kr"),
    ("Spain", "es"),
    ("Sweden", "se"),
    ("Switzerland", "ch"),
    ("Taiwan", "tw"),
    ("Thailand", "th"),
    ("Turkey", "tr"),
    ("UAE", "ae"),
    ("United Kingdom", "gb"),
    ("United States", "us"),
    ("Vietnam", "vn"),
];

fn default_regions() -> IndexMap<String, Region> {
    DEFAULT_REGIONS
        .iter()
        .map(|(name, iso)| {
            (
                (*iso).to_string(),
                Region {
                    name: (*name).to_string(),
                    iso: (*iso).to_string(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{RegionRegistry, GLOBAL_REGION};

    #[test]
    fn global_is_listed_first() {
        let registry = RegionRegistry::default();
        let first = registry.list().next().map(|region| region.name.clone());
        assert_eq!(first.as_deref(), Some(GLOBAL_REGION));
    }

    #[test]
    fn resolve_by_iso_or_name() {
        let registry = RegionRegistry::default();
        assert_eq!(registry.resolve("GB").name, "United Kingdom");
        assert_eq!(registry.resolve("united kingdom").iso, "gb");
        assert_eq!(registry.resolve(" Hong Kong ").iso, "hk");
    }

    #[test]
    fn unknown_region_falls_back_to_global() {
        let registry = RegionRegistry::default();
        assert!(registry.resolve("Atlantis").is_global());
        assert!(registry.resolve("").is_global());
    }
}
