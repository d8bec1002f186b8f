//! Type catalog built from Rust sources.
//!
//! Structs become object descriptors, fieldless enums become enum descriptors, and
//! single-field tuple structs become scalars. Serde attributes decide property names and
//! visibility: `rename`, `rename_all`, `skip`, `skip_serializing`, `skip_deserializing`
//! and `flatten` are honored. Doc comments become descriptions. Trait impls found
//! anywhere in the tree set capabilities:
//!
//! | impl | capability |
//! |---|---|
//! | `FromStr` | parse from text |
//! | `FromRequest`, `FromRequestParts` | binds itself from the request |
//! | `IntoResponse`, `Responder` | response shape not inferable |

use crate::parser::{ParsedSource, SourceParser};
use crate::scanner::SourceScanner;
use crate::types::{
    Capabilities, EnumDef, EnumVariant, ObjectDef, PropertyDescriptor, TypeCatalog,
    TypeDescriptor, TypeKind, TypeRef,
};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use syn::meta::ParseNestedMeta;
use syn::visit::{self, Visit};

/// Scans `root`, parses every Rust file and collects the declared types.
pub fn load_catalog(root: &Path) -> anyhow::Result<TypeCatalog> {
    let scan = SourceScanner::new(root).scan()?;
    let (sources, failures) = SourceParser::parse_all(&scan.source_files);
    if !failures.is_empty() {
        warn!("{} source files could not be parsed", failures.len());
    }
    let catalog = collect_types(&sources);
    info!(
        "Collected {} types from {} sources in {}",
        catalog.len(),
        sources.len(),
        root.display()
    );
    Ok(catalog)
}

/// Collects the types declared in `sources`.
pub fn collect_types(sources: &[ParsedSource]) -> TypeCatalog {
    let mut collector = SourceTypeCollector::new();
    for source in sources {
        debug!("Collecting types from {}", source.path.display());
        collector.add_file(&source.syntax_tree);
    }
    collector.finish()
}

/// Accumulates declarations and trait impls; [`finish`](Self::finish) resolves
/// capabilities and flattened fields once everything has been seen.
#[derive(Default)]
pub struct SourceTypeCollector {
    catalog: TypeCatalog,
    capabilities: HashMap<String, Capabilities>,
    /// Owner type -> types flattened into it
    flattened: HashMap<String, Vec<String>>,
}

impl SourceTypeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: &syn::File) {
        self.visit_file(file);
    }

    fn insert(&mut self, descriptor: TypeDescriptor) {
        if self.catalog.contains(&descriptor.name) {
            debug!("Type {} already collected, keeping the first", descriptor.name);
            return;
        }
        debug!("Collected type: {}", descriptor.name);
        self.catalog.insert(descriptor);
    }

    fn add_struct(&mut self, item: &syn::ItemStruct) {
        let name = item.ident.to_string();
        let description = doc_comment(&item.attrs);
        let container = SerdeContainer::parse(&item.attrs);

        let kind = match &item.fields {
            syn::Fields::Named(fields) => {
                let mut properties = Vec::new();
                for field in &fields.named {
                    let attrs = SerdeField::parse(&field.attrs);
                    let ty = TypeRef::from_syn(&field.ty);
                    if attrs.flatten {
                        self.flattened.entry(name.clone()).or_default().push(ty.name);
                        continue;
                    }
                    if let Some(property) = property(field, &attrs, &container, ty) {
                        properties.push(property);
                    }
                }
                TypeKind::Object(ObjectDef {
                    properties,
                    derived_types: Vec::new(),
                })
            }
            syn::Fields::Unnamed(fields) if fields.unnamed.len() == 1 => TypeKind::Scalar,
            syn::Fields::Unnamed(_) => {
                debug!("Skipping tuple struct {}", name);
                return;
            }
            syn::Fields::Unit => TypeKind::Object(ObjectDef::default()),
        };

        self.insert(TypeDescriptor {
            name,
            description,
            kind,
            capabilities: Capabilities::default(),
        });
    }

    fn add_enum(&mut self, item: &syn::ItemEnum) {
        let name = item.ident.to_string();
        let description = doc_comment(&item.attrs);

        if item.variants.iter().any(|v| !matches!(v.fields, syn::Fields::Unit)) {
            debug!("Enum {} carries data, documenting as an object", name);
            self.insert(TypeDescriptor {
                name,
                description,
                kind: TypeKind::Object(ObjectDef::default()),
                capabilities: Capabilities::default(),
            });
            return;
        }

        let container = SerdeContainer::parse(&item.attrs);
        let variants = item
            .variants
            .iter()
            .filter_map(|variant| {
                let attrs = SerdeField::parse(&variant.attrs);
                if attrs.skip || attrs.skip_serializing {
                    return None;
                }
                let original = variant.ident.to_string();
                let name = attrs.rename.unwrap_or_else(|| match container.rename_all {
                    Some(rule) => rule.apply_to_variant(&original),
                    None => original,
                });
                Some(EnumVariant {
                    name,
                    discriminant: variant
                        .discriminant
                        .as_ref()
                        .and_then(|(_, expr)| integer_literal(expr)),
                })
            })
            .collect();

        self.insert(TypeDescriptor {
            name,
            description,
            kind: TypeKind::Enum(EnumDef {
                repr: repr(&item.attrs),
                variants,
            }),
            capabilities: Capabilities::default(),
        });
    }

    fn add_impl(&mut self, item: &syn::ItemImpl) {
        let Some((_, trait_path, _)) = &item.trait_ else {
            return;
        };
        let Some(trait_name) = trait_path.segments.last().map(|s| s.ident.to_string()) else {
            return;
        };
        let self_name = TypeRef::from_syn(&item.self_ty).name;

        let capabilities = match trait_name.as_str() {
            "FromStr" => Capabilities {
                parse: true,
                ..Capabilities::default()
            },
            "FromRequest" | "FromRequestParts" | "OptionalFromRequestParts" => Capabilities {
                async_bind: true,
                ..Capabilities::default()
            },
            "IntoResponse" | "Responder" => Capabilities {
                result_wrapper: true,
                ..Capabilities::default()
            },
            _ => return,
        };
        debug!("{} implements {}", self_name, trait_name);
        let entry = self.capabilities.entry(self_name).or_default();
        entry.parse |= capabilities.parse;
        entry.async_bind |= capabilities.async_bind;
        entry.result_wrapper |= capabilities.result_wrapper;
    }

    /// Applies collected capabilities and inlines flattened fields.
    pub fn finish(mut self) -> TypeCatalog {
        for (name, capabilities) in &self.capabilities {
            if let Some(descriptor) = self.catalog.get_mut(name) {
                descriptor.capabilities = *capabilities;
            }
        }

        let owners: Vec<String> = self.flattened.keys().cloned().collect();
        for owner in owners {
            let mut visiting = HashSet::new();
            let inherited = self.flattened_properties(&owner, &mut visiting);
            let kind = self.catalog.get_mut(&owner).map(|d| &mut d.kind);
            if let Some(TypeKind::Object(def)) = kind {
                for property in inherited {
                    if !def.properties.iter().any(|p| p.name == property.name) {
                        def.properties.push(property);
                    }
                }
            }
        }
        self.catalog
    }

    /// Properties contributed by the types flattened into `owner`, transitively.
    fn flattened_properties(
        &self,
        owner: &str,
        visiting: &mut HashSet<String>,
    ) -> Vec<PropertyDescriptor> {
        if !visiting.insert(owner.to_string()) {
            return Vec::new();
        }
        let mut properties = Vec::new();
        for inner in self.flattened.get(owner).into_iter().flatten() {
            match self.catalog.get(inner).and_then(TypeDescriptor::object_def) {
                Some(def) => properties.extend(def.properties.iter().cloned()),
                None => debug!("Flattened type {} is not an object", inner),
            }
            properties.extend(self.flattened_properties(inner, visiting));
        }
        properties
    }
}

impl<'ast> Visit<'ast> for SourceTypeCollector {
    fn visit_item_struct(&mut self, item: &'ast syn::ItemStruct) {
        self.add_struct(item);
    }

    fn visit_item_enum(&mut self, item: &'ast syn::ItemEnum) {
        self.add_enum(item);
    }

    fn visit_item_impl(&mut self, item: &'ast syn::ItemImpl) {
        self.add_impl(item);
        visit::visit_item_impl(self, item);
    }
}

fn property(
    field: &syn::Field,
    attrs: &SerdeField,
    container: &SerdeContainer,
    ty: TypeRef,
) -> Option<PropertyDescriptor> {
    if attrs.skip || (attrs.skip_serializing && attrs.skip_deserializing) {
        return None;
    }
    let ident = field.ident.as_ref()?.to_string();
    let ident = ident.trim_start_matches("r#").to_string();
    let name = attrs.rename.clone().unwrap_or_else(|| match container.rename_all {
        Some(rule) => rule.apply_to_field(&ident),
        None => ident,
    });

    let mut property = PropertyDescriptor::new(&name, ty);
    property.readable = !attrs.skip_serializing;
    property.writable = !attrs.skip_deserializing;
    property.description = doc_comment(&field.attrs);
    Some(property)
}

/// Joined `///` lines, or `None` when there are none.
fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(syn::MetaNameValue {
                value:
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(text),
                        ..
                    }),
                ..
            }) => Some(text.value().trim().to_string()),
            _ => None,
        })
        .collect();
    let text = lines.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Integer type named by `#[repr(...)]`.
fn repr(attrs: &[syn::Attribute]) -> Option<String> {
    let mut found = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("repr")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(ident) = meta.path.get_ident() {
                let name = ident.to_string();
                if name.starts_with('i') || name.starts_with('u') {
                    found = Some(name);
                }
            }
            Ok(())
        });
    }
    found
}

fn integer_literal(expr: &syn::Expr) -> Option<i64> {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(value),
            ..
        }) => value.base10_parse().ok(),
        syn::Expr::Unary(syn::ExprUnary {
            op: syn::UnOp::Neg(_),
            expr,
            ..
        }) => integer_literal(expr).map(|v| -v),
        syn::Expr::Paren(paren) => integer_literal(&paren.expr),
        _ => None,
    }
}

/// Serde `rename_all` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    pub fn from_name(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "PascalCase" => RenameRule::Pascal,
            "camelCase" => RenameRule::Camel,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "kebab-case" => RenameRule::Kebab,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebab,
            _ => return None,
        })
    }

    /// Renames a `snake_case` field.
    pub fn apply_to_field(&self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => field
                .split('_')
                .map(capitalize)
                .collect(),
            RenameRule::Camel => {
                let pascal = RenameRule::Pascal.apply_to_field(field);
                lower_first(&pascal)
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }

    /// Renames a `PascalCase` variant.
    pub fn apply_to_variant(&self, variant: &str) -> String {
        match self {
            RenameRule::Pascal => variant.to_string(),
            RenameRule::Lower => variant.to_ascii_lowercase(),
            RenameRule::Upper => variant.to_ascii_uppercase(),
            RenameRule::Camel => lower_first(variant),
            RenameRule::Snake => {
                let mut snake = String::new();
                for (i, c) in variant.char_indices() {
                    if i > 0 && c.is_uppercase() {
                        snake.push('_');
                    }
                    snake.push(c.to_ascii_lowercase());
                }
                snake
            }
            RenameRule::ScreamingSnake => RenameRule::Snake.apply_to_variant(variant).to_ascii_uppercase(),
            RenameRule::Kebab => RenameRule::Snake.apply_to_variant(variant).replace('_', "-"),
            RenameRule::ScreamingKebab => RenameRule::ScreamingSnake
                .apply_to_variant(variant)
                .replace('_', "-"),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[derive(Debug, Default)]
struct SerdeContainer {
    rename_all: Option<RenameRule>,
}

impl SerdeContainer {
    fn parse(attrs: &[syn::Attribute]) -> Self {
        let mut container = Self::default();
        for attr in serde_attrs(attrs) {
            let result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename_all") {
                    if let Some(rule) = renamed(&meta)? {
                        container.rename_all = RenameRule::from_name(&rule);
                    }
                    return Ok(());
                }
                skip_meta(&meta)
            });
            if let Err(e) = result {
                debug!("Ignoring unreadable serde attribute: {}", e);
            }
        }
        container
    }
}

#[derive(Debug, Default)]
struct SerdeField {
    rename: Option<String>,
    skip: bool,
    skip_serializing: bool,
    skip_deserializing: bool,
    flatten: bool,
}

impl SerdeField {
    fn parse(attrs: &[syn::Attribute]) -> Self {
        let mut field = Self::default();
        for attr in serde_attrs(attrs) {
            let result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    field.rename = renamed(&meta)?;
                } else if meta.path.is_ident("skip") {
                    field.skip = true;
                } else if meta.path.is_ident("skip_serializing") {
                    field.skip_serializing = true;
                } else if meta.path.is_ident("skip_deserializing") {
                    field.skip_deserializing = true;
                } else if meta.path.is_ident("flatten") {
                    field.flatten = true;
                } else {
                    skip_meta(&meta)?;
                }
                Ok(())
            });
            if let Err(e) = result {
                debug!("Ignoring unreadable serde attribute: {}", e);
            }
        }
        field
    }
}

fn serde_attrs(attrs: &[syn::Attribute]) -> impl Iterator<Item = &syn::Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("serde"))
}

/// Value of `key = "..."` or the `serialize` half of `key(serialize = "...", ...)`.
fn renamed(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        let value: syn::LitStr = meta.value()?.parse()?;
        return Ok(Some(value.value()));
    }
    let mut serialized = None;
    meta.parse_nested_meta(|nested| {
        if nested.path.is_ident("serialize") {
            let value: syn::LitStr = nested.value()?.parse()?;
            serialized = Some(value.value());
            Ok(())
        } else {
            skip_meta(&nested)
        }
    })?;
    Ok(serialized)
}

/// Consumes the value of a serde option we do not interpret.
fn skip_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|nested| skip_meta(&nested))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog_from(code: &str) -> TypeCatalog {
        let parsed = SourceParser::parse_str(Path::new("test.rs"), code).unwrap();
        collect_types(&[parsed])
    }

    fn property_names(catalog: &TypeCatalog, name: &str) -> Vec<String> {
        catalog
            .get(name)
            .and_then(TypeDescriptor::object_def)
            .unwrap()
            .properties
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    #[test]
    fn test_struct_with_doc_comments() {
        let catalog = catalog_from(
            r#"
            /// A unit of work.
            pub struct TodoTask {
                /// Unique id
                pub id: i32,
                pub title: String,
                pub due: Option<chrono::NaiveDate>,
            }
            "#,
        );
        let todo = catalog.get("TodoTask").unwrap();
        assert_eq!(todo.description.as_deref(), Some("A unit of work."));
        let def = todo.object_def().unwrap();
        assert_eq!(def.properties.len(), 3);
        assert_eq!(def.properties[0].description.as_deref(), Some("Unique id"));
        assert!(def.properties[2].ty.nullable);
        assert_eq!(def.properties[2].ty.name, "NaiveDate");
    }

    #[test]
    fn test_serde_field_attributes() {
        let catalog = catalog_from(
            r#"
            #[derive(Serialize, Deserialize)]
            #[serde(rename_all = "camelCase")]
            pub struct Account {
                pub user_name: String,
                #[serde(rename = "e-mail")]
                pub email: String,
                #[serde(skip)]
                pub cache: Vec<u8>,
                #[serde(skip_serializing)]
                pub password: String,
                #[serde(skip_deserializing, default)]
                pub created_at: u64,
                #[serde(skip_serializing_if = "Option::is_none", with = "custom")]
                pub nick_name: Option<String>,
            }
            "#,
        );
        assert_eq!(
            property_names(&catalog, "Account"),
            vec!["userName", "e-mail", "password", "createdAt", "nickName"]
        );
        let def = catalog.get("Account").unwrap().object_def().unwrap();
        assert!(!def.properties[2].readable);
        assert!(!def.properties[3].writable);
    }

    #[test]
    fn test_enums() {
        let catalog = catalog_from(
            r#"
            #[serde(rename_all = "snake_case")]
            pub enum Status { InProgress, Done }

            #[repr(u8)]
            pub enum Priority { Low = 1, Medium, High = 10 }

            pub enum Event { Created { id: i32 }, Deleted(i32) }
            "#,
        );
        let TypeKind::Enum(status) = &catalog.get("Status").unwrap().kind else {
            panic!("Status should be an enum");
        };
        let names: Vec<&str> = status.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["in_progress", "done"]);

        let TypeKind::Enum(priority) = &catalog.get("Priority").unwrap().kind else {
            panic!("Priority should be an enum");
        };
        assert_eq!(priority.repr.as_deref(), Some("u8"));
        assert_eq!(priority.discriminants(), vec![1, 2, 10]);

        assert!(catalog.get("Event").unwrap().object_def().is_some());
    }

    #[test]
    fn test_trait_impls_set_capabilities() {
        let catalog = catalog_from(
            r#"
            impl std::str::FromStr for Slug {
                type Err = String;
                fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Slug(s.to_string())) }
            }
            pub struct Slug(String);

            pub struct CurrentUser { pub id: i64 }
            impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {}

            pub struct ApiError { pub message: String }
            impl IntoResponse for ApiError {}
            "#,
        );
        let slug = catalog.get("Slug").unwrap();
        assert_eq!(slug.kind, TypeKind::Scalar);
        assert!(slug.capabilities.parse);
        assert!(catalog.get("CurrentUser").unwrap().capabilities.async_bind);
        assert!(catalog.get("ApiError").unwrap().capabilities.result_wrapper);
    }

    #[test]
    fn test_flattened_fields_are_inlined() {
        let catalog = catalog_from(
            r#"
            pub struct Page { pub page: u32, pub size: u32 }
            pub struct Audit { pub created_by: String }
            pub struct Stamped { #[serde(flatten)] pub audit: Audit, pub version: u32 }
            pub struct TodoQuery {
                pub search: Option<String>,
                #[serde(flatten)]
                pub page: Page,
                #[serde(flatten)]
                pub stamp: Stamped,
            }
            "#,
        );
        assert_eq!(
            property_names(&catalog, "TodoQuery"),
            vec!["search", "page", "size", "version", "created_by"]
        );
    }

    #[test]
    fn test_nested_modules_and_first_declaration_wins() {
        let catalog = catalog_from(
            r#"
            pub struct Item { pub sku: String }
            mod billing {
                pub struct Item { pub amount: f64 }
                pub struct Invoice { pub items: Vec<Item> }
            }
            "#,
        );
        assert!(catalog.contains("Invoice"));
        assert_eq!(property_names(&catalog, "Item"), vec!["sku"]);
    }

    #[test]
    fn test_rename_rules() {
        assert_eq!(RenameRule::Pascal.apply_to_field("due_date"), "DueDate");
        assert_eq!(RenameRule::Kebab.apply_to_field("due_date"), "due-date");
        assert_eq!(RenameRule::ScreamingSnake.apply_to_variant("InProgress"), "IN_PROGRESS");
        assert_eq!(RenameRule::Camel.apply_to_variant("InProgress"), "inProgress");
        assert_eq!(RenameRule::from_name("nonsense"), None);
    }

    #[test]
    fn test_load_catalog_from_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("models")).unwrap();
        std::fs::write(
            temp_dir.path().join("models/todo.rs"),
            "pub struct Todo { pub id: i32 }",
        )
        .unwrap();
        std::fs::write(temp_dir.path().join("broken.rs"), "pub struct {").unwrap();

        let catalog = load_catalog(temp_dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("Todo"));
    }
}
