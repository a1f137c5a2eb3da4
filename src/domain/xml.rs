//! XML signature placement and element-id resolution.

use crate::infra::error::{RestPkiError, RestPkiResult};
use serde::{Deserialize, Serialize};

/// Where the signature element is inserted relative to the located node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XmlInsertionOption {
    AppendChild,
    PrependChild,
    AppendSibling,
    PrependSibling,
}

/// Prefix used in an XPath expression and the namespace it stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceBinding {
    pub prefix: String,
    pub uri: String,
}

/// Locates the node next to which the signature element is inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureElementLocation {
    #[serde(rename = "xPath")]
    pub xpath: String,
    pub insertion_option: XmlInsertionOption,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<NamespaceBinding>,
}

impl SignatureElementLocation {
    /// Create a location, rejecting empty XPath expressions
    pub fn new(xpath: impl Into<String>, insertion_option: XmlInsertionOption) -> RestPkiResult<Self> {
        let xpath = xpath.into();
        if xpath.trim().is_empty() {
            return Err(RestPkiError::ValidationError(
                "The signature element XPath is empty".to_string(),
            ));
        }
        Ok(Self {
            xpath,
            insertion_option,
            namespaces: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.push(NamespaceBinding {
            prefix: prefix.into(),
            uri: uri.into(),
        });
        self
    }
}

/// Qualified XML name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlName {
    pub local_name: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementIdAttribute {
    pub element: XmlName,
    pub attribute: XmlName,
}

/// Tells the service which attributes carry element ids, for documents
/// where ids are not declared through a DTD or schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XmlIdResolutionTable {
    pub element_id_attributes: Vec<ElementIdAttribute>,
    pub global_id_attributes: Vec<XmlName>,
    pub include_xml_id_attribute: Option<bool>,
}

impl XmlIdResolutionTable {
    #[must_use]
    pub fn new(include_xml_id_attribute: Option<bool>) -> Self {
        Self {
            include_xml_id_attribute,
            ..Self::default()
        }
    }

    /// Attribute treated as an id on every element
    pub fn add_global_id_attribute(
        &mut self,
        local_name: impl Into<String>,
        namespace: Option<String>,
    ) -> &mut Self {
        self.global_id_attributes.push(XmlName {
            local_name: local_name.into(),
            namespace,
        });
        self
    }

    /// Attribute treated as an id only on the given element
    pub fn set_element_id_attribute(
        &mut self,
        element: XmlName,
        attribute_local_name: impl Into<String>,
        attribute_namespace: Option<String>,
    ) -> &mut Self {
        self.element_id_attributes.push(ElementIdAttribute {
            element,
            attribute: XmlName {
                local_name: attribute_local_name.into(),
                namespace: attribute_namespace,
            },
        });
        self
    }
}
