use std::fmt::Display;

use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A column of the output, in the order it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Party,
    PartyLabel,
    StartDate,
    EndDate,
}

impl Field {
    pub fn key(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Party => "party",
            Field::PartyLabel => "partyLabel",
            Field::StartDate => "start_date",
            Field::EndDate => "end_date",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Which set of fields is extracted from each row of the members table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Schema {
    /// Identity and party only.
    Basic,
    /// Identity, party and the tenure dates found in the notes column.
    #[default]
    Tenure,
}

impl Schema {
    pub fn fields(&self) -> &'static [Field] {
        match self {
            Schema::Basic => &[Field::Id, Field::Name, Field::Party, Field::PartyLabel],
            Schema::Tenure => &[
                Field::Id,
                Field::Name,
                Field::Party,
                Field::PartyLabel,
                Field::StartDate,
                Field::EndDate,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub schema: Schema,
    pub id: Option<String>,
    pub name: Option<String>,
    pub party: Option<String>,
    pub party_label: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl MemberRecord {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            id: None,
            name: None,
            party: None,
            party_label: None,
            start_date: None,
            end_date: None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        self.schema.fields().iter().map(Field::key)
    }

    pub fn value(&self, field: Field) -> Option<String> {
        match field {
            Field::Id => self.id.clone(),
            Field::Name => self.name.clone(),
            Field::Party => self.party.clone(),
            Field::PartyLabel => self.party_label.clone(),
            Field::StartDate => self.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
            Field::EndDate => self.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Values in the same order as [`MemberRecord::keys`].
    pub fn values(&self) -> Vec<Option<String>> {
        self.schema
            .fields()
            .iter()
            .map(|field| self.value(*field))
            .collect()
    }
}

impl Serialize for MemberRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.schema.fields();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for field in fields {
            map.serialize_entry(field.key(), &self.value(*field))?;
        }
        map.end()
    }
}

impl Display for MemberRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or("(unnamed)"))?;
        if let Some(label) = &self.party_label {
            write!(f, " ({})", label)?;
        }
        if let Some(id) = &self.id {
            write!(f, " [{}]", id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let mut member = MemberRecord::new(Schema::Basic);
        assert_eq!(member.to_string(), "(unnamed)");

        member.name = Some("Juozas Olekas".into());
        assert_eq!(member.to_string(), "Juozas Olekas");

        member.party_label = Some("Social Democratic Party".into());
        member.id = Some("Q102".into());
        assert_eq!(
            member.to_string(),
            "Juozas Olekas (Social Democratic Party) [Q102]"
        );
    }

    #[test]
    fn test_keys_follow_declaration_order() {
        let tenure = MemberRecord::new(Schema::Tenure);
        assert_eq!(
            tenure.keys().collect::<Vec<_>>(),
            vec!["id", "name", "party", "partyLabel", "start_date", "end_date"]
        );

        let basic = MemberRecord::new(Schema::Basic);
        assert_eq!(
            basic.keys().collect::<Vec<_>>(),
            vec!["id", "name", "party", "partyLabel"]
        );
    }

    #[test]
    fn test_values_render_dates_as_iso() {
        let mut member = MemberRecord::new(Schema::Tenure);
        member.name = Some("Viktor Uspaskich".into());
        member.start_date = NaiveDate::from_ymd_opt(2012, 11, 14);

        assert_eq!(
            member.values(),
            vec![
                None,
                Some("Viktor Uspaskich".to_string()),
                None,
                None,
                Some("2012-11-14".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_json_keeps_field_order_and_nulls() {
        let mut member = MemberRecord::new(Schema::Basic);
        member.id = Some("Q1".into());
        member.party_label = Some("Labour Party".into());

        let json = serde_json::to_string(&member).expect("Failed to serialize");
        assert_eq!(
            json,
            r#"{"id":"Q1","name":null,"party":null,"partyLabel":"Labour Party"}"#
        );
    }
}
