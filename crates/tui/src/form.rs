use patio_core::{dates, CustomerForm, Operator, OperatorFields, Vehicle};

/// Single-line text field with a char-based cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    input: String,
    cursor: usize,
    masked: bool,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let input: String = value.into();
        let cursor = input.chars().count();
        Self {
            input,
            cursor,
            masked: false,
        }
    }

    pub fn masked() -> Self {
        Self {
            masked: true,
            ..Self::default()
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn insert(&mut self, ch: char) {
        if ch.is_control() {
            return;
        }
        let at = self.byte_offset(self.cursor);
        self.input.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_offset(self.cursor);
            self.input.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_offset(self.cursor);
            self.input.remove(at);
        }
    }

    pub fn value(&self) -> &str {
        &self.input
    }

    /// Text as drawn on screen; masked fields show one `*` per char.
    pub fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.len())
        } else {
            self.input.clone()
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.input
            .char_indices()
            .nth(chars)
            .map(|(offset, _)| offset)
            .unwrap_or(self.input.len())
    }
}

/// Keys a form reacts to, decoupled from crossterm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

impl Edit {
    fn apply(self, input: &mut TextInput) {
        match self {
            Edit::Char(ch) => input.insert(ch),
            Edit::Backspace => input.backspace(),
            Edit::Delete => input.delete(),
            Edit::Left => input.move_cursor(-1),
            Edit::Right => input.move_cursor(1),
            Edit::Home => input.move_home(),
            Edit::End => input.move_end(),
        }
    }
}

fn step(focus: usize, total: usize, delta: isize) -> usize {
    if total == 0 {
        return 0;
    }
    (focus as isize + delta).rem_euclid(total as isize) as usize
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: TextInput,
    pub password: TextInput,
    pub focus: usize,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: TextInput::default(),
            password: TextInput::masked(),
            focus: 0,
        }
    }
}

impl LoginForm {
    pub fn move_focus(&mut self, delta: isize) {
        self.focus = step(self.focus, 2, delta);
    }

    pub fn edit(&mut self, edit: Edit) {
        let input = if self.focus == 0 {
            &mut self.email
        } else {
            &mut self.password
        };
        edit.apply(input);
    }
}

/// Operator create/edit form. Focus order: name, email, password, admin.
#[derive(Debug, Clone)]
pub struct OperatorEditor {
    pub id: Option<i64>,
    pub name: TextInput,
    pub email: TextInput,
    pub password: TextInput,
    pub is_admin: bool,
    pub focus: usize,
}

pub const OPERATOR_ADMIN_FIELD: usize = 3;

impl OperatorEditor {
    pub fn new() -> Self {
        Self {
            id: None,
            name: TextInput::default(),
            email: TextInput::default(),
            password: TextInput::masked(),
            is_admin: false,
            focus: 0,
        }
    }

    pub fn from_operator(operator: &Operator) -> Self {
        let fields = OperatorFields::from(operator);
        Self {
            id: Some(operator.id),
            name: TextInput::new(fields.name),
            email: TextInput::new(fields.email),
            is_admin: fields.is_admin,
            ..Self::new()
        }
    }

    pub fn move_focus(&mut self, delta: isize) {
        self.focus = step(self.focus, 4, delta);
    }

    pub fn edit(&mut self, edit: Edit) {
        match self.focus {
            0 => edit.apply(&mut self.name),
            1 => edit.apply(&mut self.email),
            2 => edit.apply(&mut self.password),
            _ => {
                if edit == Edit::Char(' ') {
                    self.is_admin = !self.is_admin;
                }
            }
        }
    }

    pub fn fields(&self) -> OperatorFields {
        OperatorFields {
            name: self.name.value().to_string(),
            email: self.email.value().to_string(),
            password: self.password.value().to_string(),
            is_admin: self.is_admin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VehicleRow {
    pub id: Option<i64>,
    pub inputs: [TextInput; 3],
}

impl VehicleRow {
    pub const LABELS: [&'static str; 3] = ["Model", "Plate", "Color"];

    fn blank() -> Self {
        Self::from_vehicle(&Vehicle::default())
    }

    fn from_vehicle(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id,
            inputs: [
                TextInput::new(vehicle.model.clone()),
                TextInput::new(vehicle.plate.clone()),
                TextInput::new(vehicle.color.clone()),
            ],
        }
    }

    fn vehicle(&self, owner: Option<i64>) -> Vehicle {
        Vehicle {
            id: self.id,
            owner_customer_id: owner,
            ..Vehicle::new(
                self.inputs[0].value(),
                self.inputs[1].value(),
                self.inputs[2].value(),
            )
        }
    }
}

/// Customer create/edit form.
///
/// Focus runs over name, birth date and then model, plate and color of every
/// vehicle row in turn.
#[derive(Debug, Clone)]
pub struct CustomerEditor {
    pub id: Option<i64>,
    pub name: TextInput,
    pub birth_date: TextInput,
    pub vehicles: Vec<VehicleRow>,
    pub focus: usize,
}

const CUSTOMER_HEAD_FIELDS: usize = 2;

impl CustomerEditor {
    pub fn new() -> Self {
        Self::from_form(CustomerForm::new())
    }

    pub fn from_form(form: CustomerForm) -> Self {
        Self {
            id: form.id,
            name: TextInput::new(form.name),
            birth_date: TextInput::new(form.birth_date),
            vehicles: form.vehicles.iter().map(VehicleRow::from_vehicle).collect(),
            focus: 0,
        }
    }

    pub fn to_form(&self) -> CustomerForm {
        CustomerForm {
            id: self.id,
            name: self.name.value().to_string(),
            birth_date: self.birth_date.value().to_string(),
            vehicles: self.vehicles.iter().map(|row| row.vehicle(self.id)).collect(),
        }
    }

    fn field_count(&self) -> usize {
        CUSTOMER_HEAD_FIELDS + self.vehicles.len() * 3
    }

    pub fn move_focus(&mut self, delta: isize) {
        self.focus = step(self.focus, self.field_count(), delta);
    }

    /// Vehicle row under the cursor, if any.
    pub fn focused_vehicle(&self) -> Option<usize> {
        self.focus
            .checked_sub(CUSTOMER_HEAD_FIELDS)
            .map(|offset| offset / 3)
            .filter(|row| *row < self.vehicles.len())
    }

    pub fn edit(&mut self, edit: Edit) {
        match self.focus {
            0 => edit.apply(&mut self.name),
            1 => edit.apply(&mut self.birth_date),
            focus => {
                let offset = focus - CUSTOMER_HEAD_FIELDS;
                if let Some(row) = self.vehicles.get_mut(offset / 3) {
                    edit.apply(&mut row.inputs[offset % 3]);
                }
            }
        }
    }

    /// Append a blank vehicle row and focus its model field.
    pub fn add_vehicle(&mut self) {
        self.vehicles.push(VehicleRow::blank());
        self.focus = CUSTOMER_HEAD_FIELDS + (self.vehicles.len() - 1) * 3;
    }

    /// Drop row `index` after the server agreed, keeping focus in range.
    pub fn drop_vehicle(&mut self, index: usize) {
        if index < self.vehicles.len() {
            self.vehicles.remove(index);
        }
        self.focus = self.focus.min(self.field_count().saturating_sub(1));
    }

    /// `dd/mm/yyyy` preview of the birth date field.
    pub fn birth_date_preview(&self) -> Option<String> {
        dates::to_display(self.birth_date.value().trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_input_edits_around_multibyte_chars() {
        let mut input = TextInput::new("Joo");
        input.move_cursor(-1);
        input.insert('ã');
        assert_eq!(input.value(), "João");
        input.move_end();
        input.backspace();
        input.move_home();
        input.delete();
        assert_eq!(input.value(), "oã");
        input.move_cursor(-5);
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn long_values_are_kept_whole() {
        let mut input = TextInput::default();
        for _ in 0..300 {
            input.insert('x');
        }
        input.insert('\n');
        assert_eq!(input.value().len(), 300);
        assert_eq!(input.cursor(), 300);
    }

    #[test]
    fn birth_date_is_submitted_as_typed() {
        let mut editor = CustomerEditor::new();
        editor.move_focus(1);
        for ch in " 2000-02-01 ".chars() {
            editor.edit(Edit::Char(ch));
        }
        assert_eq!(editor.to_form().birth_date, " 2000-02-01 ");
        assert_eq!(editor.birth_date_preview().as_deref(), Some("01/02/2000"));
    }

    #[test]
    fn masked_input_hides_its_value() {
        let mut input = TextInput::masked();
        for ch in "1234".chars() {
            input.insert(ch);
        }
        assert_eq!(input.display(), "****");
        assert_eq!(input.value(), "1234");
    }

    #[test]
    fn operator_editor_never_prefills_password() {
        let operator = Operator {
            id: 3,
            name: "Caio".to_string(),
            email: "caio@yard.com".to_string(),
            is_admin: true,
        };
        let mut editor = OperatorEditor::from_operator(&operator);
        assert!(editor.fields().password.is_empty());

        editor.focus = OPERATOR_ADMIN_FIELD;
        editor.edit(Edit::Char(' '));
        assert!(!editor.fields().is_admin);
        editor.move_focus(1);
        assert_eq!(editor.focus, 0);
    }

    #[test]
    fn customer_editor_walks_vehicle_fields() {
        let mut editor = CustomerEditor::new();
        assert_eq!(editor.vehicles.len(), 1);
        editor.move_focus(-1);
        assert_eq!(editor.focused_vehicle(), Some(0));

        editor.add_vehicle();
        editor.edit(Edit::Char('F'));
        editor.edit(Edit::Char('i'));
        editor.edit(Edit::Char('t'));
        assert_eq!(editor.focused_vehicle(), Some(1));
        assert_eq!(editor.to_form().vehicles[1].model, "Fit");

        editor.drop_vehicle(1);
        assert_eq!(editor.vehicles.len(), 1);
        assert!(editor.focus < 5);
    }

    #[test]
    fn round_trips_a_loaded_form() {
        let form = CustomerForm {
            id: Some(42),
            name: "Joao".to_string(),
            birth_date: "2000-02-01".to_string(),
            vehicles: vec![Vehicle {
                id: Some(10),
                owner_customer_id: Some(42),
                ..Vehicle::new("Fit", "ABC1234", "red")
            }],
        };
        let editor = CustomerEditor::from_form(form.clone());
        assert_eq!(editor.to_form(), form);
        assert_eq!(editor.birth_date_preview().as_deref(), Some("01/02/2000"));
    }
}
