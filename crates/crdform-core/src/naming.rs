//! Name conversion between Kubernetes field names and Terraform attribute names

/// Convert a Kubernetes camelCase field name to a snake_case attribute name
///
/// Acronym runs are kept together (`cacheNodeIDs` → `cache_node_ids`,
/// `tlsCACert` → `tls_ca_cert`) and any character that is not alphanumeric
/// becomes an underscore.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            push_separator(&mut out);
            continue;
        }

        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let after_next = chars.get(i + 2).copied();

            let word_start = prev.is_ascii_lowercase() || prev.is_ascii_digit();
            // End of an acronym run ("CACert": the 'C' before "ert"), except a
            // plural 's' closing the acronym ("IDs").
            let acronym_end = prev.is_ascii_uppercase()
                && next.is_some_and(|n| n.is_ascii_lowercase())
                && !(next == Some('s')
                    && after_next.is_none_or(|a| a.is_ascii_uppercase() || !a.is_ascii_alphanumeric()));

            if word_start || acronym_end {
                push_separator(&mut out);
            }
        }

        out.push(c.to_ascii_lowercase());
    }

    out.trim_matches('_').to_string()
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
}

/// Terraform type name for a Kind, e.g.
/// `k8s_elasticache_services_k8s_aws_cache_parameter_group_v1alpha1`
pub fn type_name(provider: &str, group: &str, kind: &str, version: &str) -> String {
    let group = group.replace(['.', '-'], "_");
    if group.is_empty() {
        format!("{}_{}_{}", provider, to_snake_case(kind), version)
    } else {
        format!("{}_{}_{}_{}", provider, group, to_snake_case(kind), version)
    }
}

/// Suffix appended to the type name of the manifest variant
pub const MANIFEST_SUFFIX: &str = "_manifest";
