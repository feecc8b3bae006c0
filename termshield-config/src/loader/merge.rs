use toml::Value;
use toml::map::{Entry, Map};

/// Lay `overlay` over `base`, the later configuration layer winning.
///
/// Nested tables are combined key by key. Scalars and arrays in `overlay`
/// replace whatever `base` holds at the same key, as does a table meeting a
/// non-table.
pub fn merge_toml_values(base: &mut Value, overlay: &Value) {
    let (Value::Table(base), Value::Table(overlay)) = (&mut *base, overlay) else {
        *base = overlay.clone();
        return;
    };

    let mut pending: Vec<(&mut Map<String, Value>, &Map<String, Value>)> = vec![(base, overlay)];
    while let Some((target, source)) = pending.pop() {
        for (key, incoming) in source {
            match target.entry(key.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(incoming.clone());
                }
                Entry::Occupied(mut slot) => match (slot.get_mut(), incoming) {
                    (Value::Table(_), Value::Table(_)) => {}
                    (existing, incoming) => *existing = incoming.clone(),
                },
            }
        }
        for (key, nested) in target.iter_mut() {
            if let (Value::Table(nested), Some(Value::Table(incoming))) = (nested, source.get(key)) {
                pending.push((nested, incoming));
            }
        }
    }
}
