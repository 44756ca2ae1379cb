//! Validation of configurations and plans against a resource schema

use serde_json::Value;

use crate::attribute::{Attribute, AttributeType, ObjectType};
use crate::convert::json_type;
use crate::diagnostics::{AttributePath, Diagnostics};
use crate::resource::ResourceSchema;
use crate::suggestions::{closest_match, did_you_mean};

/// Validate a user configuration
///
/// Setting a computed-only attribute is an error.
pub fn validate_config(schema: &ResourceSchema, config: &Value) -> Diagnostics {
    validate(schema, config, false)
}

/// Validate a plan that may already carry computed values from prior state
pub fn validate_plan(schema: &ResourceSchema, plan: &Value) -> Diagnostics {
    validate(schema, plan, true)
}

fn validate(schema: &ResourceSchema, value: &Value, allow_computed: bool) -> Diagnostics {
    let mut checker = Checker {
        allow_computed,
        diags: Diagnostics::new(),
    };

    if value.is_object() {
        checker.object(&schema.attributes, value, &AttributePath::root(), false);
    } else {
        checker.diags.add_error(
            "Invalid configuration",
            format!("{} configuration must be an object, got {}", schema.type_name, json_type(value)),
        );
    }
    checker.diags
}

struct Checker {
    allow_computed: bool,
    diags: Diagnostics,
}

impl Checker {
    /// `computed_parent` suppresses presence checks below computed attributes
    fn object(&mut self, object: &ObjectType, value: &Value, path: &AttributePath, computed_parent: bool) {
        let Some(fields) = value.as_object() else {
            return;
        };

        for (name, attribute) in object.iter() {
            let attr_path = path.child(name.as_str());
            match fields.get(name).filter(|v| !v.is_null()) {
                None => {
                    if attribute.presence.is_required() && !computed_parent {
                        self.diags.add_attribute_error(
                            attr_path,
                            "Missing required argument",
                            format!("The argument \"{}\" is required, but no definition was found.", name),
                        );
                    }
                }
                Some(item) => {
                    let computed = computed_parent || !attribute.presence.is_configurable();
                    if computed && !self.allow_computed && !computed_parent {
                        self.diags.add_attribute_error(
                            attr_path,
                            "Invalid configuration",
                            format!("\"{}\" is computed and cannot be set in configuration.", name),
                        );
                        continue;
                    }
                    self.attribute(attribute, item, &attr_path, computed);
                }
            }
        }

        for name in fields.keys() {
            if !object.contains(name) {
                let suggestion = closest_match(name, object.names());
                self.diags.add_attribute_error(
                    path.child(name.as_str()),
                    "Unsupported argument",
                    format!(
                        "An argument named \"{}\" is not expected here.{}",
                        name,
                        did_you_mean(suggestion.as_deref())
                    ),
                );
            }
        }
    }

    fn attribute(&mut self, attribute: &Attribute, value: &Value, path: &AttributePath, computed: bool) {
        if !self.value(&attribute.type_, value, path, computed) {
            return;
        }
        for validator in &attribute.validators {
            if let Err(message) = validator.validate(value) {
                self.diags
                    .add_attribute_error(path.clone(), "Invalid attribute value", message);
            }
        }
    }

    /// Returns false when the value does not have the declared type
    fn value(&mut self, type_: &AttributeType, value: &Value, path: &AttributePath, computed: bool) -> bool {
        if value.is_null() {
            return true;
        }
        if !type_.accepts(value) {
            self.diags.add_attribute_error(
                path.clone(),
                "Incorrect attribute value type",
                format!("Inappropriate value for attribute: {} required, got {}.", type_, json_type(value)),
            );
            return false;
        }

        match type_ {
            AttributeType::List(element) => {
                for (i, item) in value.as_array().into_iter().flatten().enumerate() {
                    self.value(element, item, &path.index(i), computed);
                }
            }
            AttributeType::Map(element) => {
                for (key, item) in value.as_object().into_iter().flatten() {
                    self.value(element, item, &path.key(key.as_str()), computed);
                }
            }
            AttributeType::Object(object) => self.object(object, value, path, computed),
            _ => {}
        }
        true
    }
}
