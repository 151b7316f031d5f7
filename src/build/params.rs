//! Parameter and return extraction.
//!
//! A `parameters` or `returns` declaration arrives in one of three
//! shapes: a single name, a list of names, or a map from name to a typed
//! declaration. Extraction is shared by every step kind; the `aliased`
//! flag marks the contexts (returns everywhere, reference parameters)
//! where a bare string value is an attribute alias rather than an error.

use crate::build::Compiler;
use crate::error::BuildError;
use crate::names::{is_type_name, is_var_name};
use crate::node::{Key, Node, Payload};
use crate::step::{Parameter, StepKind};
use crate::typesys::attribute_type;
use crate::value::{DeferredValue, Value};

impl Compiler<'_> {
    /// Extract the parameter list declared under `field`, or an empty
    /// list when the field is absent.
    pub(crate) fn extract_parameters(
        &mut self,
        frame: usize,
        kind: StepKind,
        node: &Node,
        field: &str,
        aliased: bool,
    ) -> Result<Vec<Parameter>, BuildError> {
        let Some(decl) = node.get(field) else {
            return Ok(Vec::new());
        };
        match &decl.payload {
            Payload::Map(entries) => {
                let mut params: Vec<Parameter> = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let p = self.make_parameter(frame, kind, node, field, key, value, aliased)?;
                    if params.iter().any(|q| q.name == p.name) {
                        return Err(BuildError::BadParameter {
                            name: p.name,
                            field: field.to_string(),
                        });
                    }
                    params.push(p);
                }
                Ok(params)
            }
            Payload::Str(name) => {
                self.named_parameters(frame, kind, node, std::slice::from_ref(name), aliased)
            }
            Payload::List(items) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some(s) => names.push(s.to_string()),
                        None => {
                            return Err(BuildError::BadParameter {
                                name: item.kind_name().to_string(),
                                field: field.to_string(),
                            })
                        }
                    }
                }
                self.named_parameters(frame, kind, node, &names, aliased)
            }
            _ => Err(BuildError::ShapeMismatch {
                field: field.to_string(),
                expected: "a name, a list of names, or a map of declarations",
                actual: decl.kind_name().to_string(),
            }),
        }
    }

    /// Name-only declarations. On the returns side of a resource step the
    /// names are attribute names and the parameter type comes from the
    /// resolved resource type; everywhere else the type is unconstrained.
    fn named_parameters(
        &mut self,
        frame: usize,
        kind: StepKind,
        node: &Node,
        names: &[String],
        aliased: bool,
    ) -> Result<Vec<Parameter>, BuildError> {
        let mut params = Vec::with_capacity(names.len());
        for name in names {
            let ptype = if aliased && kind == StepKind::Resource {
                let rt = self.resource_type(frame, node)?;
                attribute_type(&rt, name).ok_or_else(|| BuildError::AttributeNotFound {
                    type_name: rt.name().to_string(),
                    attribute: name.clone(),
                })?
            } else {
                self.ctx.types().any()
            };
            params.push(Parameter::new(name.clone(), ptype));
        }
        Ok(params)
    }

    /// One map-form declaration: `name => declaration`.
    ///
    /// The declaration is a type name, an aliased attribute name (only in
    /// aliased contexts), an already-built parameter passed through from
    /// the DSL front-end, or a structured map with `type` plus an optional
    /// `value`, `lookup` or `alias`.
    #[allow(clippy::too_many_arguments)]
    fn make_parameter(
        &mut self,
        frame: usize,
        kind: StepKind,
        node: &Node,
        field: &str,
        key: &Key,
        decl: &Node,
        aliased: bool,
    ) -> Result<Parameter, BuildError> {
        let name = key.name.as_str();
        match &decl.payload {
            Payload::Param(p) => Ok(p.clone()),
            Payload::Type(t) => Ok(Parameter::new(name, t.clone())),
            Payload::Str(s) if is_type_name(s) => {
                Ok(Parameter::new(name, self.ctx.types().parse_type(s)?))
            }
            Payload::Str(s) if aliased && is_var_name(s) => match kind {
                StepKind::Resource => {
                    let rt = self.resource_type(frame, node)?;
                    let at =
                        attribute_type(&rt, s).ok_or_else(|| BuildError::AttributeNotFound {
                            type_name: rt.name().to_string(),
                            attribute: s.clone(),
                        })?;
                    Ok(Parameter::new(name, at).with_alias(s.clone()))
                }
                _ => Ok(Parameter::new(name, self.ctx.types().any()).with_alias(s.clone())),
            },
            Payload::Map(_) => {
                let ptype = match decl.get("type") {
                    Some(tn) => match &tn.payload {
                        Payload::Str(s) => self.ctx.types().parse_type(s)?,
                        Payload::Type(t) => t.clone(),
                        _ => {
                            return Err(BuildError::ShapeMismatch {
                                field: format!("{field}.type"),
                                expected: "a type name",
                                actual: tn.kind_name().to_string(),
                            })
                        }
                    },
                    None => self.ctx.types().any(),
                };
                let value = if let Some(lookup) = decl.get("lookup") {
                    let arguments = match &lookup.payload {
                        Payload::List(items) => items
                            .iter()
                            .map(|i| i.to_value("lookup"))
                            .collect::<Result<Vec<_>, _>>()?,
                        _ => vec![lookup.to_value("lookup")?],
                    };
                    Some(Value::Deferred(DeferredValue::lookup(arguments)))
                } else {
                    match decl.get("value") {
                        Some(v) => Some(v.to_value("value")?),
                        None => None,
                    }
                };
                let alias = match decl.get("alias") {
                    Some(a) => match a.as_str() {
                        Some(s) if is_var_name(s) => Some(s.to_string()),
                        _ => {
                            return Err(BuildError::BadParameter {
                                name: name.to_string(),
                                field: field.to_string(),
                            })
                        }
                    },
                    None => None,
                };
                let mut p = Parameter::new(name, ptype);
                p.alias = alias;
                p.value = value;
                Ok(p)
            }
            _ => Err(BuildError::BadParameter {
                name: name.to_string(),
                field: field.to_string(),
            }),
        }
    }
}
