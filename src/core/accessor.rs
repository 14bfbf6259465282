//! Typed field access by (entity, field) name
//!
//! The registry is built once at startup from the `[[entities]]` configuration.
//! Rules and anonymizer lines are resolved against it, so a misspelt entity or
//! field fails before any record is touched.

use crate::config::EntityConfig;
use crate::domain::{
    Anonymizer, CustodianError, EntityType, FieldKind, FieldName, FieldValue, Result,
    TargetRecord,
};
use std::collections::{BTreeMap, HashMap};

/// Metadata for one field of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: FieldName,
    pub column: String,
    pub kind: FieldKind,
    pub selection: Option<String>,
}

/// Metadata for one entity type and its backing table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub name: EntityType,
    pub table: String,
    pub id_column: String,
    pub archived_column: String,
    fields: BTreeMap<FieldName, FieldDescriptor>,
}

impl EntityDescriptor {
    /// Descriptor with default `id` / `archived` columns and no fields
    pub fn new(name: EntityType, table: impl Into<String>) -> Self {
        Self {
            name,
            table: table.into(),
            id_column: "id".to_string(),
            archived_column: "archived".to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field whose column matches its name
    pub fn with_field(self, name: FieldName, kind: FieldKind) -> Self {
        let column = name.as_str().to_string();
        self.with_descriptor(FieldDescriptor {
            name,
            column,
            kind,
            selection: None,
        })
    }

    pub fn with_descriptor(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Looks up a field, failing with [`CustodianError::UnknownField`]
    pub fn field(&self, name: &FieldName) -> Result<&FieldDescriptor> {
        self.fields
            .get(name)
            .ok_or_else(|| CustodianError::UnknownField {
                entity: self.name.to_string(),
                field: name.to_string(),
            })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    /// Typed accessor for `name`
    pub fn accessor(&self, name: &FieldName) -> Result<FieldAccessor<'_>> {
        Ok(FieldAccessor {
            entity: &self.name,
            descriptor: self.field(name)?,
        })
    }

    fn from_config(config: &EntityConfig) -> Result<Self> {
        let name = EntityType::new(config.name.as_str()).map_err(CustodianError::Configuration)?;
        let mut descriptor = EntityDescriptor::new(name, config.table_name());
        descriptor.id_column = config.id_column.clone();
        descriptor.archived_column = config.archived_column.clone();

        for field in &config.fields {
            let field_name =
                FieldName::new(field.name.as_str()).map_err(CustodianError::Configuration)?;
            descriptor = descriptor.with_descriptor(FieldDescriptor {
                name: field_name,
                column: field.column_name().to_string(),
                kind: field.kind,
                selection: field.selection.clone(),
            });
        }
        Ok(descriptor)
    }
}

/// Getter/setter pair bound to one field
#[derive(Debug, Clone, Copy)]
pub struct FieldAccessor<'a> {
    entity: &'a EntityType,
    descriptor: &'a FieldDescriptor,
}

impl<'a> FieldAccessor<'a> {
    pub fn descriptor(&self) -> &'a FieldDescriptor {
        self.descriptor
    }

    /// Current value, `None` when null
    pub fn get<'r>(&self, record: &'r TargetRecord) -> Option<&'r FieldValue> {
        record.get(&self.descriptor.name)
    }

    /// Writes `value`, rejecting a value of the wrong kind or a record of another entity
    pub fn set(&self, record: &mut TargetRecord, value: FieldValue) -> Result<()> {
        if &record.entity != self.entity {
            return Err(CustodianError::Domain(format!(
                "Accessor for {}.{} used on a {} record",
                self.entity, self.descriptor.name, record.entity
            )));
        }
        if value.kind() != self.descriptor.kind {
            return Err(CustodianError::Domain(format!(
                "Cannot write a {} value into {}.{} ({})",
                value.kind(),
                self.entity,
                self.descriptor.name,
                self.descriptor.kind
            )));
        }
        record.put(self.descriptor.name.clone(), value);
        Ok(())
    }
}

/// All known entity descriptors
#[derive(Debug, Clone, Default)]
pub struct FieldAccessorRegistry {
    entities: HashMap<EntityType, EntityDescriptor>,
}

impl FieldAccessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from `[[entities]]` configuration
    pub fn from_config(entities: &[EntityConfig]) -> Result<Self> {
        let mut registry = Self::new();
        for entity in entities {
            registry.register(EntityDescriptor::from_config(entity)?)?;
        }
        tracing::debug!(entities = registry.entities.len(), "Field accessor registry built");
        Ok(registry)
    }

    /// Adds a descriptor; registering the same entity twice is a configuration error
    pub fn register(&mut self, descriptor: EntityDescriptor) -> Result<()> {
        if self.entities.contains_key(&descriptor.name) {
            return Err(CustodianError::Configuration(format!(
                "Entity '{}' registered twice",
                descriptor.name
            )));
        }
        self.entities.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with_entity(mut self, descriptor: EntityDescriptor) -> Result<Self> {
        self.register(descriptor)?;
        Ok(self)
    }

    /// Resolves an entity type, failing with [`CustodianError::ClassResolution`]
    pub fn resolve(&self, entity: &EntityType) -> Result<&EntityDescriptor> {
        self.entities
            .get(entity)
            .ok_or_else(|| CustodianError::ClassResolution(entity.to_string()))
    }

    pub fn accessor(&self, entity: &EntityType, field: &FieldName) -> Result<FieldAccessor<'_>> {
        self.resolve(entity)?.accessor(field)
    }

    /// Checks the anonymizer lines that target one of `entities`
    ///
    /// An anonymizer is shared between registers, so lines for entity types
    /// outside `entities` are not resolved.
    pub fn validate_anonymizer_for<'a>(
        &self,
        anonymizer: &Anonymizer,
        entities: impl IntoIterator<Item = &'a EntityType>,
    ) -> Result<()> {
        let entities: Vec<&EntityType> = entities.into_iter().collect();
        for line in anonymizer
            .lines
            .iter()
            .filter(|l| entities.contains(&&l.entity_type))
        {
            self.accessor(&line.entity_type, &line.field)?;
        }
        Ok(())
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &EntityType> {
        self.entities.keys()
    }
}
