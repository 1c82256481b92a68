//! Output schemas declared to the generation service.
//!
//! Every response is an array of flat records. A field is a string, a number
//! or an array of strings; a subset of fields is required.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    StringArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldType,
    pub required: bool,
}

impl Field {
    const fn required(name: &'static str, kind: FieldType) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    const fn optional(name: &'static str, kind: FieldType) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSchema {
    /// Short label used in logs.
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl ResponseSchema {
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }
}

pub const RECIPES: ResponseSchema = ResponseSchema {
    name: "recipes",
    fields: &[
        Field::required("id", FieldType::String),
        Field::required("title", FieldType::String),
        Field::required("description", FieldType::String),
        Field::required("ingredients", FieldType::StringArray),
        Field::required("instructions", FieldType::StringArray),
        Field::required("cookingTime", FieldType::Number),
        Field::required("servings", FieldType::Number),
        Field::optional("calories", FieldType::Number),
        Field::optional("tags", FieldType::StringArray),
    ],
};

pub const MEAL_PLAN: ResponseSchema = ResponseSchema {
    name: "meal_plan",
    fields: &[
        Field::required("day", FieldType::String),
        Field::required("breakfast", FieldType::String),
        Field::required("lunch", FieldType::String),
        Field::required("dinner", FieldType::String),
        Field::optional("snacks", FieldType::StringArray),
    ],
};

pub const SHOPPING_LIST: ResponseSchema = ResponseSchema {
    name: "shopping_list",
    fields: &[
        Field::required("id", FieldType::String),
        Field::required("name", FieldType::String),
        Field::required("category", FieldType::String),
    ],
};
