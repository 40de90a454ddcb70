// Text-entry forms.
//
// A form is an ordered list of single-line fields with one focused field.
// Key handling lives in `input`; this module only owns the editing model.

/// Field positions in `Form::create_rfq`.
pub mod rfq_field {
    pub const PRODUCT: usize = 0;
    pub const QUANTITY: usize = 1;
    pub const CATEGORY: usize = 2;
    pub const URGENCY: usize = 3;
    pub const SPECS: usize = 4;
    pub const IMAGE: usize = 5;
}

/// Field positions in `Form::register`.
pub mod register_field {
    pub const NAME: usize = 0;
    pub const EMAIL: usize = 1;
    pub const PASSWORD: usize = 2;
    pub const ROLE: usize = 3;
}

/// One labelled single-line input.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    /// Rendered as asterisks.
    pub secret: bool,
}

impl Field {
    pub fn new(label: &'static str) -> Self {
        Field {
            label,
            value: String::new(),
            secret: false,
        }
    }

    pub fn secret(label: &'static str) -> Self {
        Field {
            secret: true,
            ..Field::new(label)
        }
    }

    /// The value as it should be drawn.
    pub fn display(&self) -> String {
        if self.secret {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl Form {
    pub fn new(fields: Vec<Field>) -> Self {
        Form { fields, focus: 0 }
    }

    pub fn login() -> Self {
        Form::new(vec![Field::new("Email"), Field::secret("Password")])
    }

    pub fn register() -> Self {
        Form::new(vec![
            Field::new("Name"),
            Field::new("Email"),
            Field::secret("Password"),
            Field::new("Role (buyer/seller)"),
        ])
    }

    pub fn create_rfq() -> Self {
        Form::new(vec![
            Field::new("Product"),
            Field::new("Quantity"),
            Field::new("Category"),
            Field::new("Urgency"),
            Field::new("Specs"),
            Field::new("Image file"),
        ])
    }

    pub fn single(label: &'static str) -> Self {
        Form::new(vec![Field::new(label)])
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", |f| f.value.as_str())
    }

    pub fn set_value(&mut self, index: usize, value: &str) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = value.to_string();
        }
    }

    pub fn is_last(&self) -> bool {
        self.focus + 1 >= self.fields.len()
    }

    pub fn next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn push(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    pub fn clear(&mut self) {
        for field in &mut self.fields {
            field.value.clear();
        }
        self.focus = 0;
    }
}
