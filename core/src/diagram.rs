// stagecraft/src/diagram.rs

//! Drawing stage trees.
//!
//! [`Stage::draw`](crate::stage::Stage::draw) walks a tree and reports it to a
//! [`Diagram`]. Nested parts (decision branches, concurrent forks) are handed
//! over as callbacks that draw into whatever nested diagram the implementation
//! provides. [`OutlineDiagram`] is a plain-text implementation.

/// Receiver of a stage tree walk.
pub trait Diagram {
  /// A single step.
  fn add_activity(&mut self, label: &str);

  /// A conditional stage. Each callback draws one branch.
  fn add_decision(&mut self, label: &str, on_true: &dyn Fn(&mut dyn Diagram), on_false: &dyn Fn(&mut dyn Diagram));

  /// A parallel group. One callback per child, in child order.
  fn add_concurrency(&mut self, branches: &[&dyn Fn(&mut dyn Diagram)]);
}

/// Renders a stage tree as an indented outline:
///
/// ```text
/// - fetch
/// = parallel
///   | branch 0
///     - resize
///   | branch 1
///     - thumbnail
/// ? is_public
///   then:
///     - publish
///   else:
///     (nothing)
/// ```
#[derive(Debug, Default, Clone)]
pub struct OutlineDiagram {
  lines: Vec<String>,
  depth: usize,
}

impl OutlineDiagram {
  pub fn new() -> Self {
    Self::default()
  }

  fn nested(&self, extra_depth: usize) -> Self {
    Self {
      lines: Vec::new(),
      depth: self.depth + extra_depth,
    }
  }

  fn push(&mut self, depth: usize, text: &str) {
    self.lines.push(format!("{}{}", "  ".repeat(depth), text));
  }

  fn append_branch(&mut self, draw: &dyn Fn(&mut dyn Diagram)) {
    let mut branch = self.nested(2);
    draw(&mut branch);
    if branch.lines.is_empty() {
      let depth = branch.depth;
      branch.push(depth, "(nothing)");
    }
    self.lines.append(&mut branch.lines);
  }

  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  pub fn render(&self) -> String {
    self.lines.join("\n")
  }
}

impl Diagram for OutlineDiagram {
  fn add_activity(&mut self, label: &str) {
    self.push(self.depth, &format!("- {}", label));
  }

  fn add_decision(&mut self, label: &str, on_true: &dyn Fn(&mut dyn Diagram), on_false: &dyn Fn(&mut dyn Diagram)) {
    self.push(self.depth, &format!("? {}", label));
    self.push(self.depth + 1, "then:");
    self.append_branch(on_true);
    self.push(self.depth + 1, "else:");
    self.append_branch(on_false);
  }

  fn add_concurrency(&mut self, branches: &[&dyn Fn(&mut dyn Diagram)]) {
    self.push(self.depth, "= parallel");
    for (branch_idx, draw) in branches.iter().enumerate() {
      self.push(self.depth + 1, &format!("| branch {}", branch_idx));
      self.append_branch(*draw);
    }
  }
}
