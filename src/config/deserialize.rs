// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Accepts a single region or a list of regions; rejects empty lists.

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::types::Region;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// `regions: us-east-1`, `regions: us-east-1,eu-west-1` and a YAML list are all accepted.
pub fn deserialize_regions<'de, D>(deserializer: D) -> Result<NonEmpty<Region>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<String> = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => s.split(',').map(str::to_string).collect(),
        OneOrMany::Many(values) => values,
    };

    let mut regions: Vec<Region> = Vec::with_capacity(raw.len());
    for value in raw.iter().filter(|v| !v.trim().is_empty()) {
        let region = Region::new(value).map_err(serde::de::Error::custom)?;
        if !regions.contains(&region) {
            regions.push(region);
        }
    }

    NonEmpty::from_vec(regions)
        .ok_or_else(|| serde::de::Error::custom("at least one region is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Doc {
        #[serde(deserialize_with = "deserialize_regions")]
        regions: NonEmpty<Region>,
    }

    fn parse(yaml: &str) -> Result<Vec<String>, serde_yaml::Error> {
        serde_yaml::from_str::<Doc>(yaml)
            .map(|doc| doc.regions.iter().map(|r| r.to_string()).collect())
    }

    #[test]
    fn single_string_and_list_are_equivalent() {
        assert_eq!(parse("regions: us-east-1").unwrap(), vec!["us-east-1"]);
        assert_eq!(
            parse("regions: [us-east-1, eu-west-1]").unwrap(),
            vec!["us-east-1", "eu-west-1"]
        );
        assert_eq!(
            parse("regions: us-east-1,eu-west-1").unwrap(),
            vec!["us-east-1", "eu-west-1"]
        );
    }

    #[test]
    fn duplicates_collapse_in_order() {
        assert_eq!(
            parse("regions: [eu-west-1, us-east-1, eu-west-1]").unwrap(),
            vec!["eu-west-1", "us-east-1"]
        );
    }

    #[test]
    fn empty_and_invalid_regions_are_rejected() {
        assert!(parse("regions: []").is_err());
        assert!(parse("regions: US_EAST").is_err());
    }
}
