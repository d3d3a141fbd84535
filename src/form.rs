use super::*;

// Serialization follows the browser-side rules: selected options of a
// select, checked checkbox/radio inputs, plain text-like inputs, and
// textareas; disabled or unnamed controls contribute nothing. Every pair
// keeps its trailing '&' so fragments concatenate.
pub(crate) fn serialize_form(dom: &Dom, form: NodeId) -> String {
    let mut out = String::new();
    for control in dom.form_controls(form) {
        let Some(element) = dom.element(control) else {
            continue;
        };
        if element.disabled {
            continue;
        }
        let Some(name) = element.attrs.get("name").filter(|name| !name.is_empty()) else {
            continue;
        };

        let tag = element.tag_name.to_ascii_lowercase();
        match tag.as_str() {
            "select" => {
                for option in dom.descendants_with_tag(control, "option") {
                    if dom.attr(option, "selected").is_none() {
                        continue;
                    }
                    push_pair(&mut out, name, &dom.option_value(option));
                }
            }
            "textarea" => {
                push_pair(&mut out, name, &element.value);
            }
            "input" => {
                let input_type = element
                    .attrs
                    .get("type")
                    .map(|t| t.to_ascii_lowercase())
                    .unwrap_or_else(|| "text".to_string());
                match input_type.as_str() {
                    "checkbox" | "radio" => {
                        if element.checked {
                            push_pair(&mut out, name, &element.value);
                        }
                    }
                    "text" | "password" | "hidden" => {
                        push_pair(&mut out, name, &element.value);
                    }
                    // Submit and image inputs are carried by the submit
                    // button parameter, not by serialization.
                    _ => {}
                }
            }
            _ => {}
        }
    }
    out
}

fn push_pair(out: &mut String, name: &str, value: &str) {
    out.push_str(&percent_encode(name));
    out.push('=');
    out.push_str(&percent_encode(value));
    out.push('&');
}

// The encodeURIComponent character set.
pub(crate) fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')');
        if keep {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push_str(&format!("{byte:02X}"));
        }
    }
    out
}
