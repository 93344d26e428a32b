use std::{cmp, future::Future, io, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use patio_core::{
    controllers::{CreatedCustomer, SyncReport},
    remove_by_id, AuthService, CustomerController, CustomerForm, CustomerSummary,
    DeleteConfirmation, Error, Identified, Navigation, Operator, OperatorController, Profile,
    Route, RouteGuard, RowAction, SessionStore, Vehicle,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use serde_json::Value;
use tokio::{spawn, sync::mpsc};
use tracing::{debug, error, info, warn};

use crate::form::{
    CustomerEditor, Edit, LoginForm, OperatorEditor, TextInput, VehicleRow, OPERATOR_ADMIN_FIELD,
};

const TICK_RATE: Duration = Duration::from_millis(250);
const LABEL_WIDTH: usize = 12;
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            danger: Color::Red,
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    /// Result of a spawned workflow, tagged with the view generation that
    /// started it.
    Task { generation: u64, outcome: Outcome },
}

enum Outcome {
    LoggedIn(patio_core::Result<Profile>),
    CustomersLoaded(patio_core::Result<Vec<CustomerSummary>>),
    CustomerLoaded(patio_core::Result<CustomerForm>),
    CustomerCreated(patio_core::Result<CreatedCustomer>),
    CustomerUpdated(patio_core::Result<SyncReport>),
    VehicleRemoved {
        index: usize,
        result: patio_core::Result<Vehicle>,
    },
    CustomerDeleted(patio_core::Result<i64>),
    OperatorsLoaded(patio_core::Result<Vec<Operator>>),
    OperatorLoaded(patio_core::Result<Operator>),
    OperatorSaved(patio_core::Result<Value>),
    OperatorDeleted(patio_core::Result<i64>),
}

impl Outcome {
    fn is_session_expired(&self) -> bool {
        match self {
            Outcome::LoggedIn(Err(err))
            | Outcome::CustomersLoaded(Err(err))
            | Outcome::CustomerLoaded(Err(err))
            | Outcome::CustomerCreated(Err(err))
            | Outcome::CustomerUpdated(Err(err))
            | Outcome::VehicleRemoved {
                result: Err(err), ..
            }
            | Outcome::CustomerDeleted(Err(err))
            | Outcome::OperatorsLoaded(Err(err))
            | Outcome::OperatorLoaded(Err(err))
            | Outcome::OperatorSaved(Err(err))
            | Outcome::OperatorDeleted(Err(err)) => err.is_session_expired(),
            _ => false,
        }
    }
}

/// Services the UI drives.
pub struct Services {
    pub session: SessionStore,
    pub guard: RouteGuard,
    pub auth: AuthService,
    pub customers: CustomerController,
    pub operators: OperatorController,
}

/// Terminal front end for the operator console.
pub struct PatioApp {
    session: SessionStore,
    guard: RouteGuard,
    auth: AuthService,
    customers: CustomerController,
    operators: OperatorController,
    start_path: String,
    route: Route,
    generation: u64,
    pending: Option<&'static str>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    login: LoginForm,
    customer_list: ListView<CustomerSummary>,
    operator_list: ListView<Operator>,
    customer_editor: Option<CustomerEditor>,
    operator_editor: Option<OperatorEditor>,
    confirm: Option<DeleteConfirmation>,
    status: String,
    ticks: usize,
    should_quit: bool,
    theme: Theme,
}

impl PatioApp {
    pub fn new(services: Services, start_path: impl Into<String>) -> Self {
        Self {
            session: services.session,
            guard: services.guard,
            auth: services.auth,
            customers: services.customers,
            operators: services.operators,
            start_path: start_path.into(),
            route: Route::Login,
            generation: 0,
            pending: None,
            event_tx: None,
            login: LoginForm::default(),
            customer_list: ListView::default(),
            operator_list: ListView::default(),
            customer_editor: None,
            operator_editor: None,
            confirm: None,
            status: "Ready".to_string(),
            ticks: 0,
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        let start = self.guard.navigate(&self.start_path);
        info!(path = %self.start_path, target = %start.target(), "starting console");
        self.apply(start);

        let result = self.event_loop(&mut terminal, &mut event_rx).await;
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
        }
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                self.handle_input(event);
                true
            }
            Some(AppEvent::Tick) => {
                self.ticks = self.ticks.wrapping_add(1);
                true
            }
            Some(AppEvent::Task {
                generation,
                outcome,
            }) => {
                self.handle_task(generation, outcome);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, navigation: Navigation) {
        match navigation {
            Navigation::Redirect(route) => debug!(%route, "redirected"),
            Navigation::Denied => debug!("login required"),
            Navigation::Render(_) => {}
        }
        self.enter(navigation.target());
        if navigation == Navigation::Denied {
            self.status = Error::SessionExpired.to_string();
        }
    }

    fn go(&mut self, route: Route) {
        let navigation = self.guard.resolve(route);
        self.apply(navigation);
    }

    /// Switch views. Anything still in flight for the previous view is ignored
    /// when it completes.
    fn enter(&mut self, route: Route) {
        self.generation += 1;
        self.pending = None;
        self.confirm = None;
        self.route = route;
        debug!(%route, generation = self.generation, "entering view");

        match route {
            Route::Login => self.login = LoginForm::default(),
            Route::Customers => self.load_customers(),
            Route::NewCustomer => self.customer_editor = Some(CustomerEditor::new()),
            Route::EditCustomer(id) => {
                self.customer_editor = None;
                let customers = self.customers.clone();
                self.spawn_task("Loading customer", async move {
                    Outcome::CustomerLoaded(customers.fetch(id).await)
                });
            }
            Route::Operators => self.load_operators(),
            Route::NewOperator => self.operator_editor = Some(OperatorEditor::new()),
            Route::EditOperator(id) => {
                self.operator_editor = None;
                let operators = self.operators.clone();
                self.spawn_task("Loading operator", async move {
                    Outcome::OperatorLoaded(operators.fetch(id).await)
                });
            }
        }
    }

    fn load_customers(&mut self) {
        self.customer_list.loaded = false;
        let customers = self.customers.clone();
        self.spawn_task("Loading customers", async move {
            Outcome::CustomersLoaded(customers.list().await)
        });
    }

    fn load_operators(&mut self) {
        self.operator_list.loaded = false;
        let operators = self.operators.clone();
        self.spawn_task("Loading operators", async move {
            Outcome::OperatorsLoaded(operators.list().await)
        });
    }

    fn spawn_task<F>(&mut self, label: &'static str, task: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let Some(sender) = self.event_tx.clone() else {
            warn!(label, "no event channel; task not started");
            return;
        };
        let generation = self.generation;
        self.pending = Some(label);
        spawn(async move {
            let outcome = task.await;
            if sender
                .send(AppEvent::Task {
                    generation,
                    outcome,
                })
                .await
                .is_err()
            {
                debug!(label, "ui closed before task finished");
            }
        });
    }

    /// Refuse a new action while one is in flight for this view.
    fn busy(&mut self) -> bool {
        match self.pending {
            Some(label) => {
                self.status = format!("{label}... please wait");
                true
            }
            None => false,
        }
    }

    fn handle_task(&mut self, generation: u64, outcome: Outcome) {
        if generation != self.generation {
            if outcome.is_session_expired() {
                if let Some(navigation) = self.guard.session_expired() {
                    self.apply(navigation);
                    self.status = Error::SessionExpired.to_string();
                }
            } else {
                debug!(generation, current = self.generation, "dropping stale result");
            }
            return;
        }
        self.pending = None;

        match outcome {
            Outcome::LoggedIn(Ok(profile)) => {
                let navigation = self.guard.logged_in();
                self.apply(navigation);
                self.status = format!("Welcome, {}", profile.name);
            }
            Outcome::CustomersLoaded(Ok(customers)) => {
                self.status = format!("{} customer(s)", customers.len());
                self.customer_list.set_items(customers);
            }
            Outcome::CustomerLoaded(Ok(form)) => {
                self.status = format!("Editing {}", form.name);
                self.customer_editor = Some(CustomerEditor::from_form(form));
            }
            Outcome::CustomerCreated(Ok(created)) => {
                self.go(Route::Customers);
                self.status = format!(
                    "Customer #{} created with {} vehicle(s)",
                    created.id,
                    created.vehicle_ids.len()
                );
            }
            Outcome::CustomerCreated(Err(err)) => {
                let persisted = match &err {
                    Error::VehicleNotCreated { customer_id, .. } => Some(*customer_id),
                    _ => None,
                };
                match persisted {
                    Some(id) => {
                        self.go(Route::EditCustomer(id));
                        self.report(err);
                    }
                    None => self.fail(err),
                }
            }
            Outcome::CustomerUpdated(Ok(report)) => {
                self.go(Route::Customers);
                self.status = format!(
                    "Customer saved ({} vehicle(s) created, {} updated, {} skipped)",
                    report.created, report.updated, report.skipped
                );
            }
            Outcome::CustomerUpdated(Err(err)) => {
                let resync = matches!(err, Error::VehiclesNotSynced { .. });
                match self.route {
                    Route::EditCustomer(id) if resync => {
                        self.enter(Route::EditCustomer(id));
                        self.report(err);
                    }
                    _ => self.fail(err),
                }
            }
            Outcome::VehicleRemoved {
                index,
                result: Ok(vehicle),
            } => {
                if let Some(editor) = self.customer_editor.as_mut() {
                    editor.drop_vehicle(index);
                }
                self.status = format!("Vehicle {} removed", vehicle.label(index));
            }
            Outcome::CustomerDeleted(Ok(id)) => {
                self.customer_list.remove(id);
                self.status = format!("Customer #{id} deleted");
            }
            Outcome::OperatorsLoaded(Ok(operators)) => {
                self.status = format!("{} operator(s)", operators.len());
                self.operator_list.set_items(operators);
            }
            Outcome::OperatorLoaded(Ok(operator)) => {
                self.status = format!("Editing {}", operator.name);
                self.operator_editor = Some(OperatorEditor::from_operator(&operator));
            }
            Outcome::OperatorSaved(Ok(_)) => {
                self.go(Route::Operators);
                self.status = "Operator saved".to_string();
            }
            Outcome::OperatorDeleted(Ok(id)) => {
                self.operator_list.remove(id);
                self.status = format!("Operator #{id} deleted");
            }
            Outcome::LoggedIn(Err(err))
            | Outcome::CustomersLoaded(Err(err))
            | Outcome::CustomerLoaded(Err(err))
            | Outcome::VehicleRemoved {
                result: Err(err), ..
            }
            | Outcome::CustomerDeleted(Err(err))
            | Outcome::OperatorsLoaded(Err(err))
            | Outcome::OperatorLoaded(Err(err))
            | Outcome::OperatorSaved(Err(err))
            | Outcome::OperatorDeleted(Err(err)) => self.fail(err),
        }
    }

    /// Every failure ends on the status line; a 401 also goes back to login.
    fn fail(&mut self, err: Error) {
        if let Some(navigation) = self.guard.handle_error(&err) {
            self.apply(navigation);
        }
        self.report(err);
    }

    fn report(&mut self, err: Error) {
        match &err {
            Error::SessionExpired => info!("session expired"),
            Error::Validation(_) | Error::Forbidden(_) => debug!(%err, "rejected input"),
            _ => error!(%err, "action failed"),
        }
        self.status = format!("Error: {err}");
    }

    fn handle_input(&mut self, event: Event) {
        let Event::Key(key) = event else {
            return;
        };
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.confirm.is_some() {
            self.handle_confirm_key(key);
            return;
        }
        match self.route {
            Route::Login => self.handle_login_key(key),
            Route::Customers => self.handle_customer_list_key(key),
            Route::Operators => self.handle_operator_list_key(key),
            Route::NewCustomer | Route::EditCustomer(_) => self.handle_customer_form_key(key),
            Route::NewOperator | Route::EditOperator(_) => self.handle_operator_form_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => self.login.move_focus(1),
            KeyCode::BackTab | KeyCode::Up => self.login.move_focus(-1),
            KeyCode::Enter if self.login.focus == 0 => self.login.move_focus(1),
            KeyCode::Enter => self.submit_login(),
            _ => {
                if let Some(edit) = edit_from_key(&key) {
                    self.login.edit(edit);
                }
            }
        }
    }

    fn submit_login(&mut self) {
        if self.busy() {
            return;
        }
        let email = self.login.email.value().to_string();
        let password = self.login.password.value().to_string();
        let auth = self.auth.clone();
        self.status = "Logging in...".to_string();
        self.spawn_task("Logging in", async move {
            Outcome::LoggedIn(auth.login(&email, &password).await)
        });
    }

    fn logout(&mut self) {
        self.auth.logout();
        let navigation = self.guard.logout();
        self.apply(navigation);
        self.status = "Logged out".to_string();
    }

    /// Keys shared by both listings. Returns `true` when handled.
    fn handle_list_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('L') => self.logout(),
            KeyCode::Char('c') => self.go(Route::Customers),
            KeyCode::Char('o') => self.go(Route::Operators),
            _ => return false,
        }
        true
    }

    fn handle_customer_list_key(&mut self, key: KeyEvent) {
        if self.handle_list_key(&key) {
            return;
        }
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.customer_list.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.customer_list.move_cursor(-1),
            KeyCode::Char('r') if !self.busy() => self.load_customers(),
            KeyCode::Char('n') => self.go(Route::NewCustomer),
            KeyCode::Enter | KeyCode::Char('e') if self.permitted(RowAction::Edit) => {
                if let Some(id) = self.customer_list.selected().map(|customer| customer.id) {
                    self.go(Route::EditCustomer(id));
                }
            }
            KeyCode::Char('d') if self.permitted(RowAction::Delete) => {
                self.confirm = self.customer_list.selected().and_then(DeleteConfirmation::request);
            }
            _ => {}
        }
    }

    fn handle_operator_list_key(&mut self, key: KeyEvent) {
        if self.handle_list_key(&key) {
            return;
        }
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.operator_list.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.operator_list.move_cursor(-1),
            KeyCode::Char('r') if !self.busy() => self.load_operators(),
            KeyCode::Char('n') => self.go(Route::NewOperator),
            KeyCode::Enter | KeyCode::Char('e') if self.permitted(RowAction::Edit) => {
                if let Some(id) = self.operator_list.selected().map(|operator| operator.id) {
                    self.go(Route::EditOperator(id));
                }
            }
            KeyCode::Char('d') if self.permitted(RowAction::Delete) => {
                self.confirm = self.operator_list.selected().and_then(DeleteConfirmation::request);
            }
            _ => {}
        }
    }

    /// Check a row action against the session, reporting a refusal on the status line.
    fn permitted(&mut self, action: RowAction) -> bool {
        match self.guard.authorize(action) {
            Ok(()) => true,
            Err(err) => {
                self.fail(err);
                false
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if self.busy() {
                    return;
                }
                let Some(confirmation) = self.confirm.take() else {
                    return;
                };
                match self.route {
                    Route::Customers => {
                        let customers = self.customers.clone();
                        self.spawn_task("Deleting customer", async move {
                            Outcome::CustomerDeleted(customers.delete(confirmation).await)
                        });
                    }
                    Route::Operators => {
                        let operators = self.operators.clone();
                        self.spawn_task("Deleting operator", async move {
                            Outcome::OperatorDeleted(operators.remove(confirmation).await)
                        });
                    }
                    _ => {}
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
                self.status = "Deletion cancelled".to_string();
            }
            _ => {}
        }
    }

    fn handle_customer_form_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.go(Route::Customers);
            return;
        }
        if key.modifiers == KeyModifiers::CONTROL {
            match key.code {
                KeyCode::Char('a') => {
                    if let Some(editor) = self.customer_editor.as_mut() {
                        editor.add_vehicle();
                    }
                }
                KeyCode::Char('d') => self.remove_focused_vehicle(),
                KeyCode::Char('s') => self.submit_customer(),
                _ => {}
            }
            return;
        }
        let Some(editor) = self.customer_editor.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Tab | KeyCode::Down => editor.move_focus(1),
            KeyCode::BackTab | KeyCode::Up => editor.move_focus(-1),
            KeyCode::Enter => self.submit_customer(),
            _ => {
                if let Some(edit) = edit_from_key(&key) {
                    editor.edit(edit);
                }
            }
        }
    }

    fn submit_customer(&mut self) {
        if self.busy() {
            return;
        }
        let Some(editor) = self.customer_editor.as_ref() else {
            return;
        };
        let form = editor.to_form();
        let customers = self.customers.clone();
        match self.route {
            Route::EditCustomer(id) => {
                self.spawn_task("Saving customer", async move {
                    Outcome::CustomerUpdated(
                        customers.update(id, &form.fields(), &form.vehicles).await,
                    )
                });
            }
            _ => {
                self.spawn_task("Creating customer", async move {
                    Outcome::CustomerCreated(customers.create(&form.fields(), &form.vehicles).await)
                });
            }
        }
    }

    fn remove_focused_vehicle(&mut self) {
        if self.busy() {
            return;
        }
        let Some(editor) = self.customer_editor.as_ref() else {
            return;
        };
        let Some(index) = editor.focused_vehicle() else {
            self.status = "Move to a vehicle row to remove it".to_string();
            return;
        };
        let mut form = editor.to_form();
        let customers = self.customers.clone();
        self.spawn_task("Removing vehicle", async move {
            let result = customers.remove_vehicle(&mut form, index).await;
            Outcome::VehicleRemoved { index, result }
        });
    }

    fn handle_operator_form_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.go(Route::Operators);
            return;
        }
        if key.modifiers == KeyModifiers::CONTROL {
            if key.code == KeyCode::Char('s') {
                self.submit_operator();
            }
            return;
        }
        let Some(editor) = self.operator_editor.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Tab | KeyCode::Down => editor.move_focus(1),
            KeyCode::BackTab | KeyCode::Up => editor.move_focus(-1),
            KeyCode::Enter => self.submit_operator(),
            _ => {
                if let Some(edit) = edit_from_key(&key) {
                    editor.edit(edit);
                }
            }
        }
    }

    fn submit_operator(&mut self) {
        if self.busy() {
            return;
        }
        let Some(editor) = self.operator_editor.as_ref() else {
            return;
        };
        let fields = editor.fields();
        let operators = self.operators.clone();
        match self.route {
            Route::EditOperator(id) => {
                self.spawn_task("Saving operator", async move {
                    Outcome::OperatorSaved(operators.update(id, &fields).await)
                });
            }
            _ => {
                self.spawn_task("Creating operator", async move {
                    Outcome::OperatorSaved(operators.create(&fields).await)
                });
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(frame.size());

        self.render_header(frame, chunks[0]);
        match self.route {
            Route::Login => self.render_login(frame, chunks[1]),
            Route::Customers => self.render_customer_list(frame, chunks[1]),
            Route::Operators => self.render_operator_list(frame, chunks[1]),
            Route::NewCustomer | Route::EditCustomer(_) => {
                self.render_customer_form(frame, chunks[1])
            }
            Route::NewOperator | Route::EditOperator(_) => {
                self.render_operator_form(frame, chunks[1])
            }
        }
        self.render_status(frame, chunks[2]);
        if let Some(confirm) = &self.confirm {
            self.render_confirm(frame, confirm);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let user = match self.session.profile() {
            Some(profile) if profile.is_admin => format!("{} (admin)", profile.name),
            Some(profile) => profile.name,
            None => "not logged in".to_string(),
        };
        let line = Line::from(vec![
            Span::styled(
                "Patio",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {}", self.route), Style::default().fg(self.theme.muted)),
            Span::raw("  "),
            Span::styled(user, Style::default().fg(self.theme.primary_fg)),
        ]);
        let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    fn render_login(&self, frame: &mut Frame, area: Rect) {
        let mut form = FormLines::default();
        form.push_input("Email", &self.login.email, self.login.focus == 0, &self.theme);
        form.push_input(
            "Password",
            &self.login.password,
            self.login.focus == 1,
            &self.theme,
        );
        let width = cmp::min(60_u16, area.width);
        let target = centered_rect(width, 6, area);
        self.render_form(frame, target, "Log in", form);
    }

    fn render_customer_list(&self, frame: &mut Frame, area: Rect) {
        let theme = &self.theme;
        let items = self
            .customer_list
            .items
            .iter()
            .map(|customer| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        customer.name.clone(),
                        Style::default()
                            .fg(theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" · {}", customer.vehicles_label()),
                        Style::default().fg(theme.muted),
                    ),
                ]))
            })
            .collect();
        render_list(frame, area, "Customers", items, &self.customer_list, theme);
    }

    fn render_operator_list(&self, frame: &mut Frame, area: Rect) {
        let theme = &self.theme;
        let items = self
            .operator_list
            .items
            .iter()
            .map(|operator| {
                let mut spans = vec![
                    Span::styled(
                        operator.name.clone(),
                        Style::default()
                            .fg(theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" <{}>", operator.email),
                        Style::default().fg(theme.muted),
                    ),
                ];
                if operator.is_admin {
                    spans.push(Span::styled(" admin", Style::default().fg(theme.success)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();
        render_list(frame, area, "Operators", items, &self.operator_list, theme);
    }

    fn render_customer_form(&self, frame: &mut Frame, area: Rect) {
        let title = match self.route {
            Route::EditCustomer(id) => format!("Customer #{id}"),
            _ => "New customer".to_string(),
        };
        let Some(editor) = self.customer_editor.as_ref() else {
            render_loading(frame, area, &title);
            return;
        };

        let mut form = FormLines::default();
        form.push_input("Name", &editor.name, editor.focus == 0, &self.theme);
        form.push_input(
            "Birth date",
            &editor.birth_date,
            editor.focus == 1,
            &self.theme,
        );
        let preview = editor
            .birth_date_preview()
            .unwrap_or_else(|| "yyyy-mm-dd".to_string());
        form.push(Line::from(Span::styled(
            format!("{:LABEL_WIDTH$}{preview}", ""),
            Style::default().fg(self.theme.muted),
        )));

        for (row_index, row) in editor.vehicles.iter().enumerate() {
            let saved = row.id.map(|id| format!(" #{id}")).unwrap_or_default();
            form.push(Line::from(Span::styled(
                format!("Vehicle {}{saved}", row_index + 1),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )));
            for (field, input) in row.inputs.iter().enumerate() {
                let focus = 2 + row_index * 3 + field;
                form.push_input(
                    VehicleRow::LABELS[field],
                    input,
                    editor.focus == focus,
                    &self.theme,
                );
            }
        }
        self.render_form(frame, area, &title, form);
    }

    fn render_operator_form(&self, frame: &mut Frame, area: Rect) {
        let title = match self.route {
            Route::EditOperator(id) => format!("Operator #{id}"),
            _ => "New operator".to_string(),
        };
        let Some(editor) = self.operator_editor.as_ref() else {
            render_loading(frame, area, &title);
            return;
        };

        let mut form = FormLines::default();
        form.push_input("Name", &editor.name, editor.focus == 0, &self.theme);
        form.push_input("Email", &editor.email, editor.focus == 1, &self.theme);
        form.push_input("Password", &editor.password, editor.focus == 2, &self.theme);
        let admin_focused = editor.focus == OPERATOR_ADMIN_FIELD;
        let mark = if editor.is_admin { "[x]" } else { "[ ]" };
        form.push(Line::from(vec![
            Span::styled(
                format!("{:LABEL_WIDTH$}", "Admin"),
                label_style(admin_focused, &self.theme),
            ),
            Span::raw(mark),
        ]));
        if editor.id.is_some() {
            form.push(Line::from(Span::styled(
                "Leave the password blank to keep it",
                Style::default().fg(self.theme.muted),
            )));
        }
        self.render_form(frame, area, &title, form);
    }

    fn render_form(&self, frame: &mut Frame, area: Rect, title: &str, form: FormLines) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title.to_string());
        let inner = block.inner(area);
        let visible = inner.height.max(1) as usize;
        let scroll = form
            .cursor
            .map(|(line, _)| line.saturating_sub(visible - 1))
            .unwrap_or(0);
        let paragraph = Paragraph::new(form.lines)
            .block(block)
            .scroll((scroll as u16, 0));
        frame.render_widget(paragraph, area);

        if let Some((line, column)) = form.cursor {
            let x = (inner.x + column as u16).min(inner.x + inner.width.saturating_sub(1));
            let y = inner.y + (line - scroll) as u16;
            frame.set_cursor(x, y);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = match self.pending {
            Some(label) => {
                let spinner = SPINNER[self.ticks % SPINNER.len()];
                format!("{spinner} {label}")
            }
            None => self.status.clone(),
        };
        let style = if primary.starts_with("Error") {
            Style::default().fg(self.theme.danger)
        } else {
            Style::default().fg(self.theme.primary_fg)
        };
        let help = Line::from(Span::styled(
            self.help(),
            Style::default().fg(self.theme.muted),
        ));
        let paragraph = Paragraph::new(vec![Line::from(Span::styled(primary, style)), help])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn help(&self) -> &'static str {
        if self.confirm.is_some() {
            return "y confirm  n cancel";
        }
        match self.route {
            Route::Login => "Tab next field  Enter log in  Esc quit",
            Route::Customers | Route::Operators => list_help(self.session.is_admin()),
            Route::NewCustomer | Route::EditCustomer(_) => {
                "Tab next  Enter save  Ctrl-a add vehicle  Ctrl-d remove vehicle  Esc back"
            }
            Route::NewOperator | Route::EditOperator(_) => {
                "Tab next  Space toggle admin  Enter save  Esc back"
            }
        }
    }

    fn render_confirm(&self, frame: &mut Frame, confirm: &DeleteConfirmation) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(60_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let area = centered_rect(width, 6, frame_area);
        frame.render_widget(Clear, area);

        let helper = Line::from(vec![
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" delete  "),
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]);
        let paragraph = Paragraph::new(vec![Line::from(confirm.prompt()), Line::from(""), helper])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Confirm")
                    .border_style(Style::default().fg(self.theme.danger)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

/// Lines of a form plus the position of the text cursor, if a text field
/// has focus.
#[derive(Default)]
struct FormLines {
    lines: Vec<Line<'static>>,
    cursor: Option<(usize, usize)>,
}

impl FormLines {
    fn push(&mut self, line: Line<'static>) {
        self.lines.push(line);
    }

    fn push_input(&mut self, label: &str, input: &TextInput, focused: bool, theme: &Theme) {
        if focused {
            self.cursor = Some((self.lines.len(), LABEL_WIDTH + input.cursor()));
        }
        self.lines.push(Line::from(vec![
            Span::styled(format!("{label:LABEL_WIDTH$}"), label_style(focused, theme)),
            Span::raw(input.display()),
        ]));
    }
}

fn list_help(is_admin: bool) -> &'static str {
    if is_admin {
        "j/k move  n new  Enter edit  d delete  r reload  c customers  o operators  L logout  q quit"
    } else {
        "j/k move  n new  r reload  c customers  o operators  L logout  q quit"
    }
}

fn label_style(focused: bool, theme: &Theme) -> Style {
    if focused {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.muted)
    }
}

#[derive(Debug)]
struct ListView<T> {
    items: Vec<T>,
    cursor: usize,
    loaded: bool,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
            loaded: false,
        }
    }
}

impl<T: Identified> ListView<T> {
    fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.loaded = true;
        self.clamp_cursor();
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.items.is_empty() {
            return;
        }
        let last = self.items.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
    }

    fn selected(&self) -> Option<&T> {
        self.items.get(self.cursor)
    }

    fn remove(&mut self, id: i64) {
        remove_by_id(&mut self.items, id);
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.items.len().saturating_sub(1));
    }
}

fn render_list<T>(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    items: Vec<ListItem<'static>>,
    view: &ListView<T>,
    theme: &Theme,
) {
    if !view.loaded {
        render_loading(frame, area, title);
        return;
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{title} ({})", view.items.len()));
    if items.is_empty() {
        let empty = Paragraph::new(Span::styled("Nothing here yet", Style::default().fg(theme.muted)))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let mut list_state = ListState::default();
    list_state.select(Some(view.cursor));
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(theme.selection_bg))
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_loading(frame: &mut Frame, area: Rect, title: &str) {
    let paragraph = Paragraph::new("Loading...")
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn edit_from_key(key: &KeyEvent) -> Option<Edit> {
    match key.code {
        KeyCode::Char(ch) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Edit::Char(ch))
        }
        KeyCode::Backspace => Some(Edit::Backspace),
        KeyCode::Delete => Some(Edit::Delete),
        KeyCode::Left => Some(Edit::Left),
        KeyCode::Right => Some(Edit::Right),
        KeyCode::Home => Some(Edit::Home),
        KeyCode::End => Some(Edit::End),
        _ => None,
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use patio_core::{ApiClient, HttpTransport};

    use super::*;

    fn app_with(session: SessionStore) -> PatioApp {
        let api = ApiClient::new(
            Arc::new(HttpTransport::new("http://localhost:3000")),
            session.clone(),
        );
        let services = Services {
            guard: RouteGuard::new(session.clone()),
            auth: AuthService::new(api.clone()),
            customers: CustomerController::new(api.clone()),
            operators: OperatorController::new(api),
            session,
        };
        PatioApp::new(services, "/app")
    }

    fn logged_in(is_admin: bool) -> SessionStore {
        let session = SessionStore::in_memory();
        session.set_session(
            "T1",
            is_admin,
            Profile {
                operator_id: 7,
                name: "Ana".to_string(),
                email: "a@b.com".to_string(),
                is_admin,
            },
        );
        session
    }

    fn press(app: &mut PatioApp, ch: char) {
        app.handle_input(Event::Key(KeyEvent::new(
            KeyCode::Char(ch),
            KeyModifiers::NONE,
        )));
    }

    fn operators(app: &mut PatioApp) {
        app.go(Route::Operators);
        app.operator_list.set_items(vec![Operator {
            id: 1,
            name: "Caio".to_string(),
            email: "caio@yard.com".to_string(),
            is_admin: true,
        }]);
    }

    #[test]
    fn non_admin_cannot_delete_or_edit_from_a_listing() {
        let mut app = app_with(logged_in(false));
        operators(&mut app);

        press(&mut app, 'd');
        assert!(app.confirm.is_none());
        assert_eq!(app.status, "Error: only administrators can delete records");

        press(&mut app, 'e');
        assert_eq!(app.route, Route::Operators);
        assert_eq!(app.status, "Error: only administrators can edit records");
        assert!(!app.help().contains("d delete"));
    }

    #[test]
    fn admin_gets_row_actions() {
        let mut app = app_with(logged_in(true));
        operators(&mut app);

        press(&mut app, 'd');
        assert_eq!(app.confirm.as_ref().map(DeleteConfirmation::id), Some(1));
        app.confirm = None;
        assert!(app.help().contains("d delete"));

        press(&mut app, 'e');
        assert_eq!(app.route, Route::EditOperator(1));
    }

    #[test]
    fn denied_navigation_lands_on_login_with_a_notice() {
        let mut app = app_with(SessionStore::in_memory());
        let navigation = app.guard.navigate("/app");
        app.apply(navigation);

        assert_eq!(app.route, Route::Login);
        assert_eq!(app.status, "session expired, please log in again");
    }

    #[test]
    fn unknown_path_lands_on_login_quietly() {
        let mut app = app_with(logged_in(false));
        let navigation = app.guard.navigate("/nope");
        app.apply(navigation);

        assert_eq!(app.route, Route::Login);
        assert_eq!(app.status, "Ready");
    }
}
