use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed_paths: Vec<String>,
}

impl ChangeSet {
    pub fn is_modified(&self) -> bool {
        !self.changed_paths.is_empty()
    }
}

// Field-level structural comparison. Key order and number formatting
// (`10` vs `10.0`) never count as a change.
pub fn detect_changes(original: &Value, candidate: &Value) -> ChangeSet {
    let mut changed_paths = Vec::new();
    diff_values("", original, candidate, &mut changed_paths);
    changed_paths.sort();
    changed_paths.dedup();
    ChangeSet { changed_paths }
}

fn diff_values(path: &str, left: &Value, right: &Value, out: &mut Vec<String>) {
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            for (key, left_value) in left_map {
                let child = child_path(path, key);
                match right_map.get(key) {
                    Some(right_value) => diff_values(&child, left_value, right_value, out),
                    None => out.push(child),
                }
            }
            for key in right_map.keys() {
                if !left_map.contains_key(key) {
                    out.push(child_path(path, key));
                }
            }
        }
        (Value::Array(left_items), Value::Array(right_items)) => {
            for (index, (left_item, right_item)) in left_items.iter().zip(right_items).enumerate() {
                diff_values(&format!("{path}[{index}]"), left_item, right_item, out);
            }
            let shared = left_items.len().min(right_items.len());
            let longest = left_items.len().max(right_items.len());
            for index in shared..longest {
                out.push(format!("{path}[{index}]"));
            }
        }
        (Value::Number(left_number), Value::Number(right_number)) => {
            if !numbers_equal(left_number, right_number) {
                out.push(display_path(path));
            }
        }
        _ => {
            if left != right {
                out.push(display_path(path));
            }
        }
    }
}

fn numbers_equal(left: &serde_json::Number, right: &serde_json::Number) -> bool {
    if left == right {
        return true;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}
