//! # Descriptor Graph Resolver
//!
//! Turns the raw descriptors of a [`DescriptorSource`] into the
//! serializable [`Service`] tree: every type referenced by a method or a
//! field is expanded, depth first, into a [`TypeInfo`] node.
//!
//! Resolution never fails outright once the service map is in hand. A type
//! reference the source cannot satisfy becomes an error node carrying the
//! raw reference string, and a type that references itself (directly or
//! through other messages) is cut short with a shallow, `cyclic`-marked
//! node instead of recursing forever.
use crate::schema::{
    EnumInfo, EnumValueInfo, FieldInfo, FieldOptionsInfo, Label, MessageOptionsInfo, Method,
    Service, TypeId, TypeInfo,
};
use crate::source::DescriptorSource;
use prost_types::FieldDescriptorProto;
use prost_types::field_descriptor_proto::{Label as ProtoLabel, Type as ProtoType};
use std::collections::HashSet;

/// Packages under which the reflection protocol's own services live.
/// Matched exactly against the derived package name, never by prefix.
const REFLECTION_PACKAGES: &[&str] = &["grpc.reflection.v1", "grpc.reflection.v1alpha"];

/// Enumerates the source's services and resolves each method's input and
/// output types into fully expanded [`TypeInfo`] trees.
///
/// Services living in a reflection-protocol package are infrastructure,
/// not user-facing API, and are skipped. Output order follows the source's
/// enumeration order.
///
/// # Returns
///
/// * `Ok(services)` - The resolved tree; may be empty.
/// * `Err(_)` - Only if the source fails to enumerate its services.
pub async fn resolve_services<S: DescriptorSource>(
    source: &mut S,
) -> Result<Vec<Service>, S::Error> {
    let descriptors = source.list_services().await?;
    let source = &*source;

    let mut services = Vec::with_capacity(descriptors.len());
    for (full_name, descriptor) in descriptors {
        let package_name = package_of(&full_name);

        if REFLECTION_PACKAGES.contains(&package_name) {
            continue;
        }

        let methods = descriptor
            .method
            .iter()
            .map(|method| Method {
                name: method.name().to_string(),
                input: resolve_type_info(source, method.input_type()),
                output: resolve_type_info(source, method.output_type()),
                in_stream: method.client_streaming(),
                out_stream: method.server_streaming(),
            })
            .collect();

        services.push(Service {
            name: descriptor.name().to_string(),
            package_name: package_name.to_string(),
            methods,
        });
    }

    Ok(services)
}

/// The package portion of a fully qualified service name: everything
/// before the separator preceding the final segment. A name without a
/// separator is its own package.
fn package_of(full_name: &str) -> &str {
    match full_name.rsplit_once('.') {
        Some((package, _)) => package,
        None => full_name,
    }
}

/// Resolves a type name into a fully expanded [`TypeInfo`] tree.
///
/// Absence of the referenced type is a representable outcome, not a
/// failure: the returned node then carries the reserved error tag and the
/// reference string exactly as given.
pub fn resolve_type_info<S: DescriptorSource>(source: &S, type_name: &str) -> TypeInfo {
    TypeResolver {
        source,
        resolving: HashSet::new(),
    }
    .resolve(type_name)
}

struct TypeResolver<'a, S> {
    source: &'a S,
    /// Type names being expanded on the current recursion path.
    resolving: HashSet<String>,
}

impl<S: DescriptorSource> TypeResolver<'_, S> {
    fn resolve(&mut self, type_name: &str) -> TypeInfo {
        let source = self.source;

        let Some(message) = source.resolve_type(type_name) else {
            return TypeInfo::unresolved(type_name);
        };

        if self.resolving.contains(type_name) {
            return TypeInfo::cycle(message.name());
        }
        self.resolving.insert(type_name.to_string());

        let mut info = TypeInfo {
            id: TypeId::Message,
            name: message.name().to_string(),
            fields: Vec::with_capacity(message.field.len()),
            options: message.options.as_ref().map(MessageOptionsInfo::from),
            cyclic: false,
        };
        for field in &message.field {
            info.fields.push(self.resolve_field(field));
        }

        self.resolving.remove(type_name);
        info
    }

    fn resolve_field(&mut self, field: &FieldDescriptorProto) -> FieldInfo {
        let classification = TypeId::from(field.r#type());
        let type_name = field.type_name();

        let mut type_info = if type_name.is_empty() {
            TypeInfo::scalar(classification)
        } else {
            let mut resolved = self.resolve(type_name);
            // The classification reflects how this field sees the type
            // (e.g. message vs. group), so it wins over whatever the
            // nested resolution produced.
            resolved.id = classification;
            resolved
        };

        let mut enum_info = None;
        if field.r#type() == ProtoType::Enum {
            type_info.name = TypeInfo::ENUM_TOKEN.to_string();
            enum_info = self.source.resolve_enum(type_name).map(|descriptor| EnumInfo {
                name: descriptor.name().to_string(),
                values: descriptor
                    .value
                    .iter()
                    .map(|value| EnumValueInfo {
                        name: value.name().to_string(),
                        number: value.number(),
                    })
                    .collect(),
            });
        }

        FieldInfo {
            name: field.name().to_string(),
            number: field.number(),
            label: field
                .label
                .and_then(|raw| ProtoLabel::try_from(raw).ok())
                .map(Label::from),
            ty: type_info,
            enum_info,
            options: field.options.as_ref().map(FieldOptionsInfo::from),
        }
    }
}
