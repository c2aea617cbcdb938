//! Trigger/action events.
//!
//! Event text is compiled once into the types below. Running a frame's events
//! only walks these trees and touches the globals region; it never parses,
//! allocates or fails. Anything that does not compile degrades to a neutral
//! value: unknown variables read as 0 and ignore writes, malformed expressions
//! evaluate to 0, and unrecognised triggers never fire.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::api::types::FrameContext;
use crate::memory::buffer::{IntWidth, StateBuffer};
use crate::memory::layout::{MemoryLayout, RegionKind};
use crate::script::ast::{EventDef, SchemaVar};
use crate::script::value::parse_int;
use crate::systems::probe::ColorTag;

/// Prefix of every variable reference in actions.
pub const STATE_PREFIX: &str = "State.";

/// A schema variable checked against the globals region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundVar {
    /// Offset from the start of the globals region.
    pub offset: usize,
    pub width: IntWidth,
}

impl BoundVar {
    pub fn read(&self, buffer: &StateBuffer) -> i64 {
        buffer.read_int(RegionKind::Globals, self.offset, self.width) as i64
    }

    /// Store `value` truncated to the variable's width.
    pub fn write(&self, buffer: &mut StateBuffer, value: i64) {
        buffer.write_int(RegionKind::Globals, self.offset, self.width, value as i32);
    }
}

/// Schema names (with their `$`) → bound variables.
pub type VarTable = IndexMap<String, BoundVar>;

/// Bind every schema variable that fits inside the globals region.
/// Variables that don't fit are reported and left unbound.
pub fn bind_schema(
    schema: &IndexMap<String, SchemaVar>,
    layout: &MemoryLayout,
    diagnostics: &mut Vec<String>,
) -> VarTable {
    let mut vars = VarTable::new();
    for (name, var) in schema {
        match layout.assert_block_offset(RegionKind::Globals, var.addr, var.width.bytes()) {
            Ok(()) => {
                vars.insert(
                    name.clone(),
                    BoundVar {
                        offset: var.addr,
                        width: var.width,
                    },
                );
            }
            Err(err) => diagnostics.push(format!("schema variable '{}' dropped: {}", name, err)),
        }
    }
    vars
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    OnFrame,
    Input(String),
    Collision(ColorTag, ColorTag),
    /// Unrecognised trigger text.
    Never,
}

impl Trigger {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "OnFrame" {
            return Some(Trigger::OnFrame);
        }
        if let Some(inner) = call_args(text, "Input") {
            let action = inner.trim();
            return (!action.is_empty()).then(|| Trigger::Input(action.to_string()));
        }
        if let Some(inner) = call_args(text, "Collision") {
            let (a, b) = inner.split_once(',')?;
            return Some(Trigger::Collision(ColorTag::parse(a)?, ColorTag::parse(b)?));
        }
        None
    }

    pub fn fires(&self, buffer: &StateBuffer, ctx: &FrameContext<'_>) -> bool {
        match self {
            Trigger::OnFrame => true,
            Trigger::Input(action) => ctx.input.contains(action),
            Trigger::Collision(a, b) => ctx.probe.contact(buffer, a, b),
            Trigger::Never => false,
        }
    }
}

/// `Name(args)` → `args`.
fn call_args<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Literal(i64),
    Var(BoundVar),
    /// A `State.$NAME` with no schema entry. Reads as 0.
    Unknown,
}

impl Operand {
    fn parse(text: &str, vars: &VarTable) -> Option<Self> {
        let text = text.trim();
        if let Some(n) = parse_int(text) {
            return Some(Operand::Literal(n));
        }
        let name = var_name(text)?;
        Some(vars.get(name).map_or(Operand::Unknown, |&var| Operand::Var(var)))
    }

    fn value(&self, buffer: &StateBuffer) -> i64 {
        match self {
            Operand::Literal(n) => *n,
            Operand::Var(var) => var.read(buffer),
            Operand::Unknown => 0,
        }
    }
}

/// `State.$NAME` → `$NAME`.
fn var_name(text: &str) -> Option<&str> {
    let name = text.trim().strip_prefix(STATE_PREFIX)?;
    let ident = name.strip_prefix('$')?;
    let valid = !ident.is_empty() && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinOp::Add),
            '-' => Some(BinOp::Sub),
            '*' => Some(BinOp::Mul),
            '/' => Some(BinOp::Div),
            _ => None,
        }
    }

    /// Wrapping arithmetic; division by zero is 0.
    pub fn apply(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            BinOp::Add => lhs.wrapping_add(rhs),
            BinOp::Sub => lhs.wrapping_sub(rhs),
            BinOp::Mul => lhs.wrapping_mul(rhs),
            BinOp::Div if rhs == 0 => 0,
            BinOp::Div => lhs.wrapping_div(rhs),
        }
    }
}

/// A literal, a variable, or exactly one binary operation between two of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Atom(Operand),
    Binary(Operand, BinOp, Operand),
    /// Anything else. Evaluates to 0.
    Invalid,
}

impl Expr {
    pub fn compile(text: &str, vars: &VarTable) -> Self {
        let text = text.trim();
        if let Some(operand) = Operand::parse(text, vars) {
            return Expr::Atom(operand);
        }
        let Some((at, op)) = find_operator(text) else {
            return Expr::Invalid;
        };
        let lhs = Operand::parse(&text[..at], vars);
        let rhs = Operand::parse(&text[at + 1..], vars);
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => Expr::Binary(lhs, op, rhs),
            _ => Expr::Invalid,
        }
    }

    pub fn eval(&self, buffer: &StateBuffer) -> i64 {
        match self {
            Expr::Atom(operand) => operand.value(buffer),
            Expr::Binary(lhs, op, rhs) => op.apply(lhs.value(buffer), rhs.value(buffer)),
            Expr::Invalid => 0,
        }
    }
}

/// First binary operator. A sign directly after the start or after another
/// operator belongs to the number that follows.
fn find_operator(text: &str) -> Option<(usize, BinOp)> {
    let mut prev: Option<char> = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            continue;
        }
        if let Some(op) = BinOp::from_char(c) {
            let unary = prev.map_or(true, |p| BinOp::from_char(p).is_some());
            if !unary {
                return Some((i, op));
            }
        }
        prev = Some(c);
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
}

/// `State.$VAR (=|+=|-=) EXPR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// None for an unknown variable; the action then does nothing.
    pub target: Option<BoundVar>,
    pub op: AssignOp,
    pub expr: Expr,
}

impl Action {
    /// Compile one action line. Returns None when the line isn't an
    /// assignment to `State.$NAME` at all.
    pub fn compile(text: &str, vars: &VarTable) -> Option<Self> {
        let eq = text.find('=')?;
        let (lhs, op) = match text[..eq].chars().last() {
            Some('+') => (&text[..eq - 1], AssignOp::Add),
            Some('-') => (&text[..eq - 1], AssignOp::Sub),
            _ => (&text[..eq], AssignOp::Set),
        };
        let name = var_name(lhs)?;
        Some(Self {
            target: vars.get(name).copied(),
            op,
            expr: Expr::compile(&text[eq + 1..], vars),
        })
    }

    pub fn run(&self, buffer: &mut StateBuffer) {
        let Some(target) = self.target else {
            return;
        };
        let value = self.expr.eval(buffer);
        let result = match self.op {
            AssignOp::Set => value,
            AssignOp::Add => target.read(buffer).wrapping_add(value),
            AssignOp::Sub => target.read(buffer).wrapping_sub(value),
        };
        target.write(buffer, result);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledEvent {
    pub trigger: Trigger,
    pub actions: Vec<Action>,
}

impl CompiledEvent {
    pub fn compile(def: &EventDef, vars: &VarTable, diagnostics: &mut Vec<String>) -> Self {
        let trigger = Trigger::parse(&def.trigger).unwrap_or_else(|| {
            diagnostics.push(format!("unknown trigger '{}' never fires", def.trigger));
            Trigger::Never
        });

        let mut actions = Vec::with_capacity(def.actions.len());
        for text in &def.actions {
            match Action::compile(text, vars) {
                Some(action) => {
                    if action.target.is_none() {
                        diagnostics.push(format!("action '{}' writes an unknown variable", text));
                    }
                    if action.expr == Expr::Invalid {
                        diagnostics.push(format!("action '{}' has an invalid expression", text));
                    }
                    actions.push(action);
                }
                None => diagnostics.push(format!("action '{}' is not an assignment", text)),
            }
        }
        Self { trigger, actions }
    }
}

/// Run every event whose trigger fires, in declaration order. Actions see the
/// writes of earlier actions in the same frame.
pub fn run_events(buffer: &mut StateBuffer, events: &[CompiledEvent], ctx: &FrameContext<'_>) {
    for event in events {
        if !event.trigger.fires(buffer, ctx) {
            continue;
        }
        for action in &event.actions {
            action.run(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::kernel::KernelConfig;
    use crate::input::state::InputState;
    use crate::systems::probe::{CollisionProbe, NoContact};
    use glam::UVec2;

    struct AlwaysContact;

    impl CollisionProbe for AlwaysContact {
        fn contact(&self, _: &StateBuffer, _: &ColorTag, _: &ColorTag) -> bool {
            true
        }
    }

    fn setup() -> (StateBuffer, VarTable) {
        let buf = StateBuffer::zeroed(64, 64, &KernelConfig::default()).unwrap();
        let mut schema = IndexMap::new();
        schema.insert("$PosX".to_string(), SchemaVar { addr: 0, width: IntWidth::Int16 });
        schema.insert("$Lives".to_string(), SchemaVar { addr: 2, width: IntWidth::Int8 });
        schema.insert("$Big".to_string(), SchemaVar { addr: 4, width: IntWidth::Int32 });
        let mut diags = Vec::new();
        let vars = bind_schema(&schema, buf.layout(), &mut diags);
        assert!(diags.is_empty());
        (buf, vars)
    }

    fn run(buf: &mut StateBuffer, vars: &VarTable, trigger: &str, actions: &[&str], input: &InputState) {
        let def = EventDef {
            trigger: trigger.to_string(),
            actions: actions.iter().map(|s| s.to_string()).collect(),
        };
        let event = CompiledEvent::compile(&def, vars, &mut Vec::new());
        let ctx = FrameContext { world: UVec2::new(64, 64), input, probe: &NoContact };
        run_events(buf, &[event], &ctx);
    }

    fn read(buf: &StateBuffer, vars: &VarTable, name: &str) -> i64 {
        vars[name].read(buf)
    }

    #[test]
    fn add_assign_updates_variable() {
        let (mut buf, vars) = setup();
        vars["$PosX"].write(&mut buf, 10);
        run(&mut buf, &vars, "OnFrame", &["State.$PosX += 5"], &InputState::new());
        assert_eq!(read(&buf, &vars, "$PosX"), 15);
    }

    #[test]
    fn unknown_variable_leaves_memory_unchanged() {
        let (mut buf, vars) = setup();
        vars["$PosX"].write(&mut buf, 10);
        let before = buf.snapshot();
        run(
            &mut buf,
            &vars,
            "OnFrame",
            &["State.$Missing = 7", "State.$Missing += State.$PosX"],
            &InputState::new(),
        );
        assert_eq!(buf.snapshot(), before);

        run(&mut buf, &vars, "OnFrame", &["State.$PosX = State.$Missing + 3"], &InputState::new());
        assert_eq!(read(&buf, &vars, "$PosX"), 3);
    }

    #[test]
    fn expressions() {
        let (buf, vars) = setup();
        let eval = |text: &str| Expr::compile(text, &vars).eval(&buf);
        assert_eq!(eval("42"), 42);
        assert_eq!(eval("-3"), -3);
        assert_eq!(eval("7 - -2"), 9);
        assert_eq!(eval("6*7"), 42);
        assert_eq!(eval("-8 / 2"), -4);
        assert_eq!(eval("5 / 0"), 0);
        assert_eq!(eval("1 + 2 + 3"), 0);
        assert_eq!(eval("hello"), 0);
        assert_eq!(eval("$PosX + 1"), 0);
        assert_eq!(Expr::compile("1 + 2 + 3", &vars), Expr::Invalid);
    }

    #[test]
    fn assignment_forms_and_truncation() {
        let (mut buf, vars) = setup();
        let input = InputState::new();
        run(&mut buf, &vars, "OnFrame", &["State.$Lives = 3", "State.$Lives -= 1"], &input);
        assert_eq!(read(&buf, &vars, "$Lives"), 2);

        run(&mut buf, &vars, "OnFrame", &["State.$Lives = 130"], &input);
        assert_eq!(read(&buf, &vars, "$Lives"), -126);

        run(&mut buf, &vars, "OnFrame", &["State.$Big = State.$Lives * 1000"], &input);
        assert_eq!(read(&buf, &vars, "$Big"), -126_000);

        run(&mut buf, &vars, "OnFrame", &["State.$PosX = 1 + 2 + 3"], &input);
        assert_eq!(read(&buf, &vars, "$PosX"), 0);
    }

    #[test]
    fn non_assignments_are_dropped() {
        let vars = VarTable::new();
        let mut diags = Vec::new();
        let def = EventDef {
            trigger: "OnFrame".into(),
            actions: vec!["Spawn(Hero)".into(), "$X = 1".into(), "State.$X = 1".into()],
        };
        let event = CompiledEvent::compile(&def, &vars, &mut diags);
        assert_eq!(event.actions.len(), 1);
        assert_eq!(event.actions[0].target, None);
        assert_eq!(diags.len(), 3);
    }

    #[test]
    fn triggers() {
        assert_eq!(Trigger::parse("OnFrame"), Some(Trigger::OnFrame));
        assert_eq!(Trigger::parse("Input( Jump )"), Some(Trigger::Input("Jump".into())));
        assert_eq!(Trigger::parse("Input()"), None);
        assert_eq!(Trigger::parse("OnTimer(5)"), None);
        match Trigger::parse("Collision(Hero:#FF0000, Coin:#FFFF00)") {
            Some(Trigger::Collision(a, b)) => {
                assert_eq!(a.entity, "Hero");
                assert_eq!(b.color, [0xFF, 0xFF, 0x00]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn input_trigger_needs_action() {
        let (mut buf, vars) = setup();
        run(&mut buf, &vars, "Input(Jump)", &["State.$Lives += 1"], &InputState::new());
        assert_eq!(read(&buf, &vars, "$Lives"), 0);
        run(&mut buf, &vars, "Input(Jump)", &["State.$Lives += 1"], &InputState::from_actions(["Jump"]));
        assert_eq!(read(&buf, &vars, "$Lives"), 1);
    }

    #[test]
    fn collision_trigger_asks_the_probe() {
        let (mut buf, vars) = setup();
        let def = EventDef {
            trigger: "Collision(Hero:#FF0000, Coin:#FFFF00)".into(),
            actions: vec!["State.$Lives += 1".into()],
        };
        let events = [CompiledEvent::compile(&def, &vars, &mut Vec::new())];
        let input = InputState::new();

        let ctx = FrameContext { world: UVec2::new(64, 64), input: &input, probe: &NoContact };
        run_events(&mut buf, &events, &ctx);
        assert_eq!(read(&buf, &vars, "$Lives"), 0);

        let ctx = FrameContext { world: UVec2::new(64, 64), input: &input, probe: &AlwaysContact };
        run_events(&mut buf, &events, &ctx);
        assert_eq!(read(&buf, &vars, "$Lives"), 1);
    }

    #[test]
    fn unknown_trigger_never_fires() {
        let (mut buf, vars) = setup();
        let mut diags = Vec::new();
        let def = EventDef { trigger: "Whenever".into(), actions: vec!["State.$Lives = 9".into()] };
        let event = CompiledEvent::compile(&def, &vars, &mut diags);
        assert_eq!(event.trigger, Trigger::Never);
        assert_eq!(diags.len(), 1);
        let input = InputState::new();
        let ctx = FrameContext { world: UVec2::new(64, 64), input: &input, probe: &NoContact };
        run_events(&mut buf, &[event], &ctx);
        assert_eq!(read(&buf, &vars, "$Lives"), 0);
    }

    #[test]
    fn schema_outside_globals_is_rejected() {
        let buf = StateBuffer::zeroed(64, 64, &KernelConfig::default()).unwrap();
        let mut schema = IndexMap::new();
        schema.insert("$Edge".to_string(), SchemaVar { addr: 1022, width: IntWidth::Int16 });
        schema.insert("$Over".to_string(), SchemaVar { addr: 1022, width: IntWidth::Int32 });
        let mut diags = Vec::new();
        let vars = bind_schema(&schema, buf.layout(), &mut diags);
        assert!(vars.contains_key("$Edge"));
        assert!(!vars.contains_key("$Over"));
        assert_eq!(diags.len(), 1);
    }
}
