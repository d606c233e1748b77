use anyhow::Context;
use clap::Parser;
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use foldergraph::canvas::Rect;
use foldergraph::session::Frame as Diagram;
use foldergraph::source::load_items;
use foldergraph::{CoMove, GraphSession, LayoutConfig, NodeId, PointerButton, RenderNode, Service, TreeNode};
use glam::Vec2;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect as UiRect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use ratatui::{Frame, Terminal};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PAN_STEP: f32 = 4.0;

#[derive(Parser, Debug)]
#[command(name = "foldergraph-tui", about = "Browse and rearrange cloud folders as a tree")]
struct Args {
    /// JSON array of folder items
    items: PathBuf,

    /// Layout config (JSON); defaults to the terminal preset
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Logs go to the file named by FOLDERGRAPH_LOG; nothing is written otherwise.
fn init_tracing() -> anyhow::Result<()> {
    let Some(path) = std::env::var_os("FOLDERGRAPH_LOG") else {
        return Ok(());
    };
    let file = std::fs::File::create(&path)
        .with_context(|| format!("cannot create log file {}", PathBuf::from(&path).display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("foldergraph=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

struct App {
    session: GraphSession,
    status: String,
    selected: Option<NodeId>,
    diagram_area: Option<UiRect>,
    should_quit: bool,
}

impl App {
    fn new(session: GraphSession) -> Self {
        Self {
            session,
            status: String::from("Drag nodes to rearrange; click to expand"),
            selected: None,
            diagram_area: None,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('f') => self.cycle_filter(),
            KeyCode::Char('m') => self.switch_co_move(),
            KeyCode::Char('r') => self.session.viewport_mut().reset(),
            KeyCode::Char('c') => {
                self.session.collapse_all();
                self.status = String::from("Expansion reset to defaults");
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(id) = self.selected.clone() {
                    self.toggle(&id);
                }
            }
            KeyCode::Left => self.session.viewport_mut().pan(Vec2::new(PAN_STEP, 0.0)),
            KeyCode::Right => self.session.viewport_mut().pan(Vec2::new(-PAN_STEP, 0.0)),
            KeyCode::Up => self.session.viewport_mut().pan(Vec2::new(0.0, PAN_STEP / 2.0)),
            KeyCode::Down => self.session.viewport_mut().pan(Vec2::new(0.0, -PAN_STEP / 2.0)),
            KeyCode::Esc => {
                if self.session.pointer_capture_lost().is_some() {
                    self.status = String::from("Drag cancelled");
                } else {
                    self.selected = None;
                }
            }
            _ => {}
        }
    }

    fn on_mouse(&mut self, event: MouseEvent) {
        let screen = Vec2::new(event.column as f32, event.row as f32);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if !self.in_diagram(event.column, event.row) {
                    return;
                }
                if let Some(id) = self.session.pointer_down(screen, PointerButton::Primary) {
                    self.selected = Some(id);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.session.pointer_move(screen);
            }
            MouseEventKind::Up(MouseButton::Left) => self.finish_gesture(),
            MouseEventKind::ScrollUp => self.session.viewport_mut().pan(Vec2::new(0.0, PAN_STEP)),
            MouseEventKind::ScrollDown => self.session.viewport_mut().pan(Vec2::new(0.0, -PAN_STEP)),
            _ => {}
        }
    }

    /// A press released without movement is a click and toggles instead of dropping.
    fn finish_gesture(&mut self) {
        let Some(moved) = self.session.drag_moved() else {
            return;
        };
        if moved {
            if let Some(outcome) = self.session.pointer_up() {
                self.status = match outcome.reordered {
                    Some((parent, _)) => format!("Moved {}; reordered under {}", outcome.node, parent),
                    None => format!("Moved {}", outcome.node),
                };
            }
        } else if let Some(id) = self.session.pointer_capture_lost() {
            self.toggle(&id);
        }
    }

    fn toggle(&mut self, id: &NodeId) {
        self.status = match self.session.toggle(id) {
            Some(true) => format!("Expanded {id}"),
            Some(false) => format!("Collapsed {id}"),
            None => format!("{id} has no children"),
        };
    }

    fn cycle_filter(&mut self) {
        let services = self.session.services();
        let next = match self.session.service_filter() {
            None => services.first().copied(),
            Some(current) => services
                .iter()
                .position(|s| *s == current)
                .and_then(|i| services.get(i + 1).copied()),
        };
        self.session.set_service_filter(next);
        self.status = match next {
            Some(service) => format!("Showing {}", service.display_name()),
            None => String::from("Showing all services"),
        };
    }

    fn switch_co_move(&mut self) {
        let next = match self.session.co_move() {
            CoMove::Subtree => CoMove::NodeOnly,
            CoMove::NodeOnly => CoMove::Subtree,
        };
        self.session.set_co_move(next);
        self.status = format!("Drag moves {}", co_move_label(next));
    }

    fn in_diagram(&self, x: u16, y: u16) -> bool {
        self.diagram_area
            .map(|area| point_in_rect(area, x, y))
            .unwrap_or(false)
    }
}

fn co_move_label(co_move: CoMove) -> &'static str {
    match co_move {
        CoMove::Subtree => "whole subtree",
        CoMove::NodeOnly => "single node",
    }
}

fn point_in_rect(rect: UiRect, x: u16, y: u16) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn format_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Absent figures read "n/a" so they are never mistaken for zero.
fn metric_or_na(value: Option<u64>, fmt: impl Fn(u64) -> String) -> String {
    value.map(fmt).unwrap_or_else(|| "n/a".to_string())
}

fn service_color(service: Option<Service>) -> Color {
    match service {
        Some(Service::Notion) => Color::Rgb(235, 235, 235),
        Some(Service::GoogleDrive) => Color::Rgb(66, 133, 244),
        Some(Service::Dropbox) => Color::Rgb(0, 97, 254),
        Some(Service::OneDrive) => Color::Rgb(40, 168, 234),
        Some(Service::Box) => Color::Rgb(0, 113, 197),
        Some(Service::SharePoint) => Color::Rgb(3, 120, 124),
        Some(Service::Confluence) => Color::Rgb(23, 43, 77),
        None => Color::Rgb(246, 211, 101),
    }
}

struct DiagramWidget<'a> {
    diagram: &'a Diagram,
    session: &'a GraphSession,
    selected: Option<&'a NodeId>,
}

impl DiagramWidget<'_> {
    fn to_cell(&self, world: Vec2, area: UiRect) -> Option<(u16, u16)> {
        let screen = self.session.viewport().world_to_screen(world);
        let (x, y) = (screen.x.round(), screen.y.round());
        let inside = x >= area.x as f32
            && y >= area.y as f32
            && x < (area.x + area.width) as f32
            && y < (area.y + area.height) as f32;
        inside.then_some((x as u16, y as u16))
    }

    fn put(&self, buf: &mut Buffer, area: UiRect, world: Vec2, ch: char, style: Style) {
        if let Some(cell) = self.to_cell(world, area) {
            buf[cell].set_char(ch).set_style(style);
        }
    }

    /// Elbow from the parent's left edge down to the child's row, then across.
    fn draw_edge(&self, buf: &mut Buffer, area: UiRect, from: &RenderNode, to: &RenderNode) {
        let style = Style::default().fg(Color::Rgb(110, 110, 120));
        let stem_x = from.x + 1.0;
        let (top, bottom) = if to.y >= from.y + 1.0 {
            (from.y + 1.0, to.y)
        } else {
            (to.y, from.y - 1.0)
        };
        let mut y = top;
        while y <= bottom {
            self.put(buf, area, Vec2::new(stem_x, y), '│', style);
            y += 1.0;
        }
        let (left, right) = if to.x > stem_x {
            (stem_x + 1.0, to.x - 1.0)
        } else {
            (to.x + to.width, stem_x - 1.0)
        };
        let mut x = left;
        while x <= right {
            self.put(buf, area, Vec2::new(x, to.y), '─', style);
            x += 1.0;
        }
        self.put(buf, area, Vec2::new(stem_x, to.y), '└', style);
    }

    fn draw_node(&self, buf: &mut Buffer, area: UiRect, node: &RenderNode) {
        let is_selected = self.selected == Some(&node.id);
        let mut style = Style::default().fg(service_color(node.service));
        if is_selected || node.dragging {
            style = style.add_modifier(Modifier::REVERSED);
        }
        if node.is_root || node.depth == 1 {
            style = style.add_modifier(Modifier::BOLD);
        }

        let marker = match (node.child_count, node.expanded) {
            (0, _) => ' ',
            (_, true) => '▾',
            (_, false) => '▸',
        };
        let width = node.width.max(1.0) as usize;
        let mut label = format!("{marker} {}", node.label);
        if label.chars().count() > width {
            label = label.chars().take(width.saturating_sub(1)).collect();
            label.push('…');
        }

        for (i, ch) in label.chars().enumerate() {
            self.put(buf, area, Vec2::new(node.x + i as f32, node.y), ch, style);
        }
    }
}

impl Widget for DiagramWidget<'_> {
    fn render(self, area: UiRect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        for y in area.y..area.y.saturating_add(area.height) {
            for x in area.x..area.x.saturating_add(area.width) {
                buf[(x, y)]
                    .set_char(' ')
                    .set_style(Style::default().bg(Color::Rgb(18, 18, 20)));
            }
        }

        for edge in &self.diagram.edges {
            let (Some(from), Some(to)) = (self.diagram.node(&edge.source), self.diagram.node(&edge.target))
            else {
                continue;
            };
            self.draw_edge(buf, area, from, to);
        }

        let viewport = self.session.viewport();
        for node in &self.diagram.nodes {
            let bounds = Rect::new(node.x, node.y, node.width, node.height);
            if viewport.is_in_viewport(&bounds, 0.0) {
                self.draw_node(buf, area, node);
            }
        }
    }
}

fn detail_lines(node: Option<&RenderNode>, path: Option<String>) -> Vec<Line<'static>> {
    let Some(node) = node else {
        return vec![Line::from("Selected: (none)")];
    };
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::Gray));
    let metrics = node.metrics.clone().unwrap_or_default();

    let mut lines = vec![
        Line::from(vec![label("Name: "), Span::raw(node.label.clone())]),
        Line::from(vec![
            label("Service: "),
            Span::raw(node.service.map(|s| s.display_name()).unwrap_or("-")),
        ]),
        Line::from(vec![
            label("Path: "),
            Span::raw(path.unwrap_or_else(|| node.lineage.join(" / "))),
        ]),
        Line::from(vec![
            label("Size: "),
            Span::raw(metric_or_na(metrics.size_bytes, format_size)),
        ]),
        Line::from(vec![
            label("Files: "),
            Span::raw(metric_or_na(metrics.file_count, |n| n.to_string())),
            Span::raw("  "),
            label("Folders: "),
            Span::raw(metric_or_na(metrics.folder_count, |n| n.to_string())),
        ]),
        Line::from(vec![
            label("Children: "),
            Span::raw(node.child_count.to_string()),
        ]),
    ];
    if let Some(modified) = node.modified_at.clone() {
        lines.push(Line::from(vec![label("Modified: "), Span::raw(modified)]));
    }
    if let Some(score) = node.activity_score {
        lines.push(Line::from(vec![label("Activity: "), Span::raw(format!("{score:.2}"))]));
    }
    if let Some(link) = node.link.clone() {
        lines.push(Line::from(vec![label("Link: "), Span::raw(link)]));
    }
    lines
}

fn draw_ui(frame: &mut Frame, app: &mut App) {
    let root = frame.area();
    let split = Layout::horizontal([Constraint::Length(42), Constraint::Min(30)]).split(root);
    let left = split[0];
    let right = split[1];

    let left_block = Block::default()
        .title(" foldergraph ")
        .borders(Borders::ALL);
    let left_inner = left_block.inner(left);
    frame.render_widget(left_block, left);

    let left_rows = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(8),
        Constraint::Length(7),
    ])
    .split(left_inner);

    let filter = app
        .session
        .service_filter()
        .map(|s| s.display_name())
        .unwrap_or("all");
    let status_lines = vec![
        Line::from(app.status.clone()),
        Line::from(format!(
            "Filter: {filter}   Drag: {}",
            co_move_label(app.session.co_move())
        )),
    ];
    frame.render_widget(
        Paragraph::new(status_lines).block(Block::default().title(" Status ").borders(Borders::ALL)),
        left_rows[0],
    );

    let diagram_block = Block::default()
        .title(" Folders (drag to reorder, click to expand) ")
        .borders(Borders::ALL);
    let diagram_inner = diagram_block.inner(right);
    frame.render_widget(diagram_block, right);
    app.diagram_area = Some(diagram_inner);
    app.session.viewport_mut().update_viewport(Rect::new(
        diagram_inner.x as f32,
        diagram_inner.y as f32,
        diagram_inner.width as f32,
        diagram_inner.height as f32,
    ));

    let diagram = app.session.frame();
    let selected = app.selected.as_ref().and_then(|id| diagram.node(id));
    let path = match app.selected.as_ref() {
        Some(id) => app.session.view_tree().find(id).map(TreeNode::display_path),
        None => None,
    };
    frame.render_widget(
        Paragraph::new(detail_lines(selected, path))
            .block(Block::default().title(" Selection ").borders(Borders::ALL)),
        left_rows[1],
    );

    let help_lines = vec![
        Line::from("Drag: move + reorder   Click: expand"),
        Line::from("Enter: toggle selected   Esc: cancel"),
        Line::from("f: filter   m: drag mode   c: collapse"),
        Line::from("r: reset view"),
        Line::from("Arrows/scroll: pan   q: quit"),
    ];
    frame.render_widget(
        Paragraph::new(help_lines).block(Block::default().title(" Controls ").borders(Borders::ALL)),
        left_rows[2],
    );

    if diagram.nodes.len() <= 1 {
        frame.render_widget(
            Paragraph::new("No folders from a recognized service.")
                .style(Style::default().fg(Color::Gray)),
            diagram_inner,
        );
    } else {
        frame.render_widget(
            DiagramWidget {
                diagram: &diagram,
                session: &app.session,
                selected: app.selected.as_ref(),
            },
            diagram_inner,
        );
    }
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|frame| {
            draw_ui(frame, app);
        })?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                // Losing focus drops the pointer capture
                Event::FocusLost => {
                    if app.session.pointer_capture_lost().is_some() {
                        app.status = String::from("Drag cancelled");
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing()?;

    let config = match &args.config {
        Some(path) => LayoutConfig::load(path)
            .with_context(|| format!("loading layout config {}", path.display()))?,
        None => LayoutConfig::terminal(),
    };
    let items = load_items(&args.items)
        .with_context(|| format!("loading folders from {}", args.items.display()))?;
    info!(items = items.len(), "loaded folder collection");

    let session = GraphSession::new(&items, config).context("invalid layout config")?;
    let mut app = App::new(session);

    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let app_result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    Ok(app_result?)
}
