//! # Schema Tree
//!
//! The serializable records produced by the resolver: a flat list of
//! [`Service`]s, each holding [`Method`]s whose input and output types are
//! fully expanded [`TypeInfo`] trees.
//!
//! Every record serializes with the field names a generic API explorer
//! expects (`name`, `package_name`, `in`, `out`, ...). Optional data is
//! omitted from the serialized form entirely rather than emitted as a
//! null/zero placeholder, so each absence is modeled as an `Option`, an
//! empty collection, or a `false` flag with an explicit skip rule.
use prost_types::field_descriptor_proto::{Label as ProtoLabel, Type as ProtoType};
use prost_types::{FieldOptions, MessageOptions};
use serde::{Deserialize, Serialize};

/// A named collection of methods, grouped by the package the service's
/// fully qualified name declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub package_name: String,
    pub methods: Vec<Method>,
}

/// A single RPC of a [`Service`], with fully expanded input/output types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,

    #[serde(rename = "in")]
    pub input: TypeInfo,
    #[serde(rename = "out")]
    pub output: TypeInfo,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub in_stream: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub out_stream: bool,
}

/// The generic node of the schema tree.
///
/// A node is one of: a resolved message type (fields populated), a scalar
/// or enum type marker (name is the type keyword, no fields), a shallow
/// reference breaking a reference cycle (`cyclic` set), or an unresolvable
/// type reference (`id` is [`TypeId::Error`], name is the raw reference).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<MessageOptionsInfo>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cyclic: bool,
}

impl TypeInfo {
    /// Reserved type name carried by every enum-classified field.
    pub const ENUM_TOKEN: &'static str = "enum";

    /// The degenerate node representing a type reference the descriptor
    /// source could not resolve. Keeps the reference string exactly as
    /// given so the consumer can still display it.
    pub fn unresolved(type_name: &str) -> Self {
        Self {
            id: TypeId::Error,
            name: type_name.to_string(),
            ..Self::default()
        }
    }

    /// A leaf node for a primitive field, named after the scalar keyword.
    pub fn scalar(id: TypeId) -> Self {
        Self {
            id,
            name: id.keyword().to_string(),
            ..Self::default()
        }
    }

    /// A shallow reference substituted when a message is reached again
    /// while it is still being expanded on the current resolution path.
    pub fn cycle(name: &str) -> Self {
        Self {
            id: TypeId::Message,
            name: name.to_string(),
            cyclic: true,
            ..Self::default()
        }
    }
}

/// One field of a resolved message type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub number: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(rename = "type")]
    pub ty: TypeInfo,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_info: Option<EnumInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptionsInfo>,
}

/// An enum type: its name plus the declared values in declaration order.
///
/// Values are not required to be unique or contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<EnumValueInfo>,
}

/// A symbolic enum value name paired with its wire number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValueInfo {
    pub name: String,
    pub number: i32,
}

/// The wire type classification of a field, serialized as its numeric
/// protobuf type code. Tag `0` is reserved for unresolvable references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum TypeId {
    #[default]
    Error = 0,
    Double = 1,
    Float = 2,
    Int64 = 3,
    Uint64 = 4,
    Int32 = 5,
    Fixed64 = 6,
    Fixed32 = 7,
    Bool = 8,
    String = 9,
    Group = 10,
    Message = 11,
    Bytes = 12,
    Uint32 = 13,
    Enum = 14,
    Sfixed32 = 15,
    Sfixed64 = 16,
    Sint32 = 17,
    Sint64 = 18,
}

impl TypeId {
    /// The lowercase keyword for this classification, as it appears in a
    /// `.proto` source file. Total over every tag, so scalar type markers
    /// never carry a residual `TYPE_` prefix.
    pub fn keyword(self) -> &'static str {
        match self {
            TypeId::Error => "error",
            TypeId::Double => "double",
            TypeId::Float => "float",
            TypeId::Int64 => "int64",
            TypeId::Uint64 => "uint64",
            TypeId::Int32 => "int32",
            TypeId::Fixed64 => "fixed64",
            TypeId::Fixed32 => "fixed32",
            TypeId::Bool => "bool",
            TypeId::String => "string",
            TypeId::Group => "group",
            TypeId::Message => "message",
            TypeId::Bytes => "bytes",
            TypeId::Uint32 => "uint32",
            TypeId::Enum => "enum",
            TypeId::Sfixed32 => "sfixed32",
            TypeId::Sfixed64 => "sfixed64",
            TypeId::Sint32 => "sint32",
            TypeId::Sint64 => "sint64",
        }
    }
}

impl From<ProtoType> for TypeId {
    fn from(ty: ProtoType) -> Self {
        match ty {
            ProtoType::Double => TypeId::Double,
            ProtoType::Float => TypeId::Float,
            ProtoType::Int64 => TypeId::Int64,
            ProtoType::Uint64 => TypeId::Uint64,
            ProtoType::Int32 => TypeId::Int32,
            ProtoType::Fixed64 => TypeId::Fixed64,
            ProtoType::Fixed32 => TypeId::Fixed32,
            ProtoType::Bool => TypeId::Bool,
            ProtoType::String => TypeId::String,
            ProtoType::Group => TypeId::Group,
            ProtoType::Message => TypeId::Message,
            ProtoType::Bytes => TypeId::Bytes,
            ProtoType::Uint32 => TypeId::Uint32,
            ProtoType::Enum => TypeId::Enum,
            ProtoType::Sfixed32 => TypeId::Sfixed32,
            ProtoType::Sfixed64 => TypeId::Sfixed64,
            ProtoType::Sint32 => TypeId::Sint32,
            ProtoType::Sint64 => TypeId::Sint64,
        }
    }
}

impl From<TypeId> for i32 {
    fn from(id: TypeId) -> Self {
        id as i32
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown type classification tag '{0}'")]
pub struct UnknownTypeTag(pub i32);

impl TryFrom<i32> for TypeId {
    type Error = UnknownTypeTag;

    fn try_from(tag: i32) -> Result<Self, UnknownTypeTag> {
        match tag {
            0 => Ok(TypeId::Error),
            1 => Ok(TypeId::Double),
            2 => Ok(TypeId::Float),
            3 => Ok(TypeId::Int64),
            4 => Ok(TypeId::Uint64),
            5 => Ok(TypeId::Int32),
            6 => Ok(TypeId::Fixed64),
            7 => Ok(TypeId::Fixed32),
            8 => Ok(TypeId::Bool),
            9 => Ok(TypeId::String),
            10 => Ok(TypeId::Group),
            11 => Ok(TypeId::Message),
            12 => Ok(TypeId::Bytes),
            13 => Ok(TypeId::Uint32),
            14 => Ok(TypeId::Enum),
            15 => Ok(TypeId::Sfixed32),
            16 => Ok(TypeId::Sfixed64),
            17 => Ok(TypeId::Sint32),
            18 => Ok(TypeId::Sint64),
            other => Err(UnknownTypeTag(other)),
        }
    }
}

/// The repetition label of a field, serialized as its numeric protobuf
/// label code. Absent when the source schema's syntax carries no label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum Label {
    Optional = 1,
    Required = 2,
    Repeated = 3,
}

impl From<ProtoLabel> for Label {
    fn from(label: ProtoLabel) -> Self {
        match label {
            ProtoLabel::Optional => Label::Optional,
            ProtoLabel::Required => Label::Required,
            ProtoLabel::Repeated => Label::Repeated,
        }
    }
}

impl From<Label> for i32 {
    fn from(label: Label) -> Self {
        label as i32
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown field label tag '{0}'")]
pub struct UnknownLabelTag(pub i32);

impl TryFrom<i32> for Label {
    type Error = UnknownLabelTag;

    fn try_from(tag: i32) -> Result<Self, UnknownLabelTag> {
        match tag {
            1 => Ok(Label::Optional),
            2 => Ok(Label::Required),
            3 => Ok(Label::Repeated),
            other => Err(UnknownLabelTag(other)),
        }
    }
}

/// Serializable projection of the standard message-level options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOptionsInfo {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub map_entry: bool,
}

impl From<&MessageOptions> for MessageOptionsInfo {
    fn from(options: &MessageOptions) -> Self {
        Self {
            deprecated: options.deprecated(),
            map_entry: options.map_entry(),
        }
    }
}

/// Serializable projection of the standard field-level options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptionsInfo {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub packed: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

impl From<&FieldOptions> for FieldOptionsInfo {
    fn from(options: &FieldOptions) -> Self {
        Self {
            packed: options.packed(),
            deprecated: options.deprecated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_data_is_omitted_from_the_serialized_form() {
        let method = Method {
            name: "SayHello".to_string(),
            input: TypeInfo::scalar(TypeId::String),
            output: TypeInfo::unresolved("missing.Type"),
            in_stream: false,
            out_stream: true,
        };

        let json = serde_json::to_value(&method).expect("Failed to serialize method");

        assert_eq!(json["name"], "SayHello");
        assert_eq!(json["out_stream"], true);
        // A false flag, an empty field list and absent options must not
        // appear at all, not even as null.
        assert!(json.get("in_stream").is_none());
        assert!(json["in"].get("fields").is_none());
        assert!(json["in"].get("options").is_none());
        assert!(json["in"].get("cyclic").is_none());
    }

    #[test]
    fn type_tags_and_labels_serialize_as_numeric_codes() {
        let field = FieldInfo {
            name: "count".to_string(),
            number: 3,
            label: Some(Label::Repeated),
            ty: TypeInfo::scalar(TypeId::Int32),
            enum_info: None,
            options: None,
        };

        let json = serde_json::to_value(&field).expect("Failed to serialize field");

        assert_eq!(json["label"], 3);
        assert_eq!(json["type"]["id"], 5);
        assert_eq!(json["type"]["name"], "int32");
        assert!(json.get("enum").is_none());
    }

    #[test]
    fn serialized_trees_round_trip() {
        let service = Service {
            name: "Greeter".to_string(),
            package_name: "pkg".to_string(),
            methods: vec![Method {
                name: "SayHello".to_string(),
                input: TypeInfo {
                    id: TypeId::Message,
                    name: "HelloRequest".to_string(),
                    fields: vec![FieldInfo {
                        name: "mode".to_string(),
                        number: 1,
                        label: Some(Label::Optional),
                        ty: TypeInfo::scalar(TypeId::Enum),
                        enum_info: Some(EnumInfo {
                            name: "Mode".to_string(),
                            values: vec![EnumValueInfo {
                                name: "MODE_UNSPECIFIED".to_string(),
                                number: 0,
                            }],
                        }),
                        options: None,
                    }],
                    options: None,
                    cyclic: false,
                },
                output: TypeInfo::unresolved("missing.Type"),
                in_stream: false,
                out_stream: false,
            }],
        };

        let json = serde_json::to_string(&service).expect("Failed to serialize service");
        let parsed: Service = serde_json::from_str(&json).expect("Failed to deserialize service");

        assert_eq!(parsed, service);
    }

    #[test]
    fn scalar_keywords_carry_no_residual_prefix() {
        assert_eq!(TypeId::Int32.keyword(), "int32");
        assert_eq!(TypeId::Bytes.keyword(), "bytes");
        assert_eq!(TypeId::Sfixed64.keyword(), "sfixed64");
        assert_eq!(TypeId::Enum.keyword(), "enum");
        assert_eq!(TypeId::Message.keyword(), "message");
        assert_eq!(TypeId::Error.keyword(), "error");
    }
}
