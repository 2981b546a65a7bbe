use std::collections::HashSet;

use layers::{Properties, PropertyValue};

use crate::config::KeyAliasConfig;

/// One row of the popup attribute table.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub key: String,
    pub value: PropertyValue,
    pub highlight: bool,
}

impl Attribute {
    fn plain(key: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            key: key.into(),
            value,
            highlight: false,
        }
    }

    fn highlighted(key: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            key: key.into(),
            value,
            highlight: true,
        }
    }
}

/// Display-ready popup data for one feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectedData {
    pub title: String,
    pub onp: Option<PropertyValue>,
    pub region: Option<PropertyValue>,
    pub district: Option<PropertyValue>,
    pub population: Option<PropertyValue>,
    pub attributes: Vec<Attribute>,
}

/// Text of an optional header field; absent fields render empty.
pub fn field_text(value: Option<&PropertyValue>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

/// Projects a feature property bag into popup data.
///
/// Attribute order:
/// 1. combined `won / applied` summary (highlighted), missing sides as `0`;
/// 2. win share (highlighted);
/// 3. one row per known period with data, missing sides as `undefined`;
/// 4. every other key, in encounter order.
///
/// Keys never repeat: a row whose key was already emitted is skipped, and
/// step 4 also skips the keys the earlier steps read.
pub fn project(properties: Option<&Properties>, aliases: &KeyAliasConfig) -> Option<ProjectedData> {
    let properties = properties?;

    Some(ProjectedData {
        title: title(properties, aliases),
        onp: properties.present(&aliases.onp).cloned(),
        region: properties.present(&aliases.region).cloned(),
        district: properties.present(&aliases.district).cloned(),
        population: properties.present(&aliases.population).cloned(),
        attributes: attributes(properties, aliases),
    })
}

fn title(properties: &Properties, aliases: &KeyAliasConfig) -> String {
    let city_type = properties
        .get(&aliases.city_type)
        .filter(|v| v.is_truthy())
        .map(|v| format!("{v}."));
    let city_name = properties
        .get(&aliases.city_name)
        .filter(|v| v.is_truthy())
        .map(ToString::to_string);

    [city_type, city_name]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}

fn attributes(properties: &Properties, aliases: &KeyAliasConfig) -> Vec<Attribute> {
    let mut rows = Rows::default();

    let applied = properties.present(&aliases.applied);
    let won = properties.present(&aliases.won);
    if applied.is_some() || won.is_some() {
        let value = format!("{} / {}", or_zero(won), or_zero(applied));
        rows.push(Attribute::highlighted(
            aliases.summary_label.clone(),
            PropertyValue::String(value),
        ));
    }

    if let Some(share) = properties.present(&aliases.win_share) {
        rows.push(Attribute::highlighted(aliases.win_share.clone(), share.clone()));
    }

    let mut consumed: HashSet<String> = HashSet::new();
    for period in &aliases.periods {
        let applied_key = aliases.period_applied_key(period);
        let won_key = aliases.period_won_key(period);
        if properties.present(&applied_key).is_some() || properties.present(&won_key).is_some() {
            let value = format!(
                "{} / {}",
                or_undefined(properties.get(&won_key)),
                or_undefined(properties.get(&applied_key)),
            );
            rows.push(Attribute::plain(period.clone(), PropertyValue::String(value)));
        }
        consumed.insert(applied_key);
        consumed.insert(won_key);
    }

    consumed.extend(aliases.header_keys().iter().map(|k| k.to_string()));
    consumed.insert(aliases.applied.clone());
    consumed.insert(aliases.won.clone());
    consumed.insert(aliases.win_share.clone());

    for (key, value) in properties.iter() {
        if consumed.contains(key) {
            continue;
        }
        rows.push(Attribute::plain(key, value.clone()));
    }

    rows.out
}

/// Attribute rows where the first row for a key wins.
#[derive(Default)]
struct Rows {
    out: Vec<Attribute>,
    emitted: HashSet<String>,
}

impl Rows {
    fn push(&mut self, row: Attribute) {
        if self.emitted.insert(row.key.clone()) {
            self.out.push(row);
        }
    }
}

fn or_zero(value: Option<&PropertyValue>) -> String {
    value.map_or_else(|| "0".to_string(), ToString::to_string)
}

// Periodic rows keep the host's rendering of a missing side.
fn or_undefined(value: Option<&PropertyValue>) -> String {
    value.map_or_else(|| "undefined".to_string(), ToString::to_string)
}
