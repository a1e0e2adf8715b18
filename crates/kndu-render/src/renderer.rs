use std::io::{self, Stdout, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use crate::format::{format_age, format_resource};
use crate::table::Table;
use kndu_types::{NodeRecord, NodeView, PrintSnapshot};

/// Printed instead of a table when the cluster has no nodes
pub const NO_NODES_MESSAGE: &str = "no nodes to display...";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The snapshot came from a failed fetch and carries no node list
    #[error("node list is missing from the snapshot")]
    MissingNodes,

    #[error("failed to write output")]
    Io(#[from] io::Error),
}

/// Draws a snapshot to some display
pub trait Render: Send {
    fn render(&mut self, snapshot: &PrintSnapshot) -> Result<(), RenderError>;
}

/// Renders snapshots as a text table to a writer
#[derive(Debug)]
pub struct TableRenderer<W> {
    out: W,
    clear_screen: bool,
}

impl TableRenderer<Stdout> {
    /// Renderer writing to standard output
    pub fn stdout(clear_screen: bool) -> Self {
        Self::new(io::stdout(), clear_screen)
    }
}

impl<W: Write> TableRenderer<W> {
    pub fn new(out: W, clear_screen: bool) -> Self {
        Self { out, clear_screen }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, snapshot: &PrintSnapshot) -> Result<(), RenderError> {
        if self.clear_screen {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }

        let nodes = match &snapshot.nodes {
            NodeView::FetchFailed => return Err(RenderError::MissingNodes),
            NodeView::Empty => &[][..],
            NodeView::HasNodes(nodes) => nodes.as_slice(),
        };

        if !snapshot.namespace.is_empty() {
            writeln!(self.out, "namespace: {}", snapshot.namespace)?;
        }

        if nodes.is_empty() {
            writeln!(self.out, "{NO_NODES_MESSAGE}")?;
            return Ok(());
        }

        let table = node_table(snapshot, nodes);
        tracing::trace!(rows = table.row_count(), "drawing node table");
        table.write_to(&mut self.out)?;
        Ok(())
    }
}

impl<W: Write + Send> Render for TableRenderer<W> {
    fn render(&mut self, snapshot: &PrintSnapshot) -> Result<(), RenderError> {
        let result = self.draw(snapshot);
        // Flush whatever was queued, including a clear before a failure
        self.out.flush()?;
        result
    }
}

fn node_table(snapshot: &PrintSnapshot, nodes: &[NodeRecord]) -> Table {
    let options = snapshot.options;

    let mut headers = vec!["NODE", "OS", "ARCH", "RUNTIME"];
    if options.show_times {
        headers.push("AGE");
    }
    if options.show_resource_limits {
        headers.extend(["CPU (ALLOC/CAP)", "MEMORY (ALLOC/CAP)"]);
    }

    let mut table = Table::new(headers);
    for node in nodes {
        let mut row = vec![
            node.name.clone(),
            node.operating_system.clone(),
            node.architecture.clone(),
            node.container_runtime_version.clone(),
        ];
        if options.show_times {
            row.push(format_age(node.created, snapshot.taken_at));
        }
        if options.show_resource_limits {
            let res = &node.resources;
            row.push(format_resource(
                res.cpu_allocatable.as_deref(),
                res.cpu_capacity.as_deref(),
            ));
            row.push(format_resource(
                res.memory_allocatable.as_deref(),
                res.memory_capacity.as_deref(),
            ));
        }
        table.push_row(row);
    }
    table
}
