use crossbeam_channel::Receiver;
use eframe::egui;
use egui_outline::{
    ErrorReporter, ExtensionDescription, FuzzyScore, OutlineConfig, OutlineError, OutlineModel, OutlinePanel,
    OutlinePanelEvent, OutlineServices, OutlineSnapshot, Position, StaticExtensionRegistry, WorkspacePathLabels,
};
use futures::executor::LocalPool;
use std::rc::Rc;

const DEMO_OUTLINE: &str = include_str!("../assets/demo_outline.json");

fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Outline Example",
        native_options,
        Box::new(|_cc| Ok(Box::new(OutlineApp::new()))),
    )
}

struct OutlineApp {
    pool: LocalPool,
    panel: OutlinePanel,
    errors: Receiver<OutlineError>,
    /// 未过滤的模型
    source: Option<Rc<OutlineModel>>,
    filter: String,
    goto_line: String,
    status_message: String,
}

impl OutlineApp {
    fn new() -> Self {
        let pool = LocalPool::new();
        let (errors, receiver) = ErrorReporter::channel();
        let services = OutlineServices {
            extensions: Rc::new(StaticExtensionRegistry::new(vec![
                ExtensionDescription::new("rust-lang.rust-analyzer", Some("rust-analyzer")),
                ExtensionDescription::new("vscode.markdown-language-features", Some("Markdown Language Features")),
            ])),
            path_labels: Rc::new(WorkspacePathLabels::new(std::env::current_dir().ok())),
            errors,
        };
        let panel = OutlinePanel::new(services, OutlineConfig::load_or_default(), pool.spawner())
            .with_config_path(OutlineConfig::default_path());

        let mut app = Self {
            pool,
            panel,
            errors: receiver,
            source: None,
            filter: String::new(),
            goto_line: String::new(),
            status_message: "Open an outline snapshot from the File menu".to_string(),
        };
        app.load_snapshot(OutlineSnapshot::from_json(DEMO_OUTLINE));
        app
    }

    fn open_snapshot(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Open Outline Snapshot")
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            log::info!("Opening outline snapshot: {:?}", path);
            self.load_snapshot(OutlineSnapshot::load_from_path(&path));
        }
    }

    fn load_snapshot(&mut self, snapshot: Result<OutlineSnapshot, OutlineError>) {
        match snapshot {
            Ok(snapshot) => {
                self.status_message = format!("Opened outline of {}", snapshot.uri);
                self.source = Some(snapshot.build());
                self.apply_filter();
            }
            Err(err) => {
                log::error!("Failed to open outline snapshot: {}", err);
                self.status_message = format!("Failed to open outline snapshot: {}", err);
            }
        }
    }

    fn apply_filter(&mut self) {
        let Some(source) = &self.source else {
            return;
        };
        let query = self.filter.trim().to_lowercase();
        let model = if query.is_empty() {
            source.clone()
        } else {
            Rc::new(source.rescored(|symbol| score_symbol(&query, &symbol.name)))
        };
        self.panel.set_model(model);
    }

    fn reveal_line(&mut self) {
        let Ok(line_number) = self.goto_line.trim().parse::<u32>() else {
            self.status_message = format!("Not a line number: {}", self.goto_line);
            return;
        };
        if self.panel.reveal_position(Position::new(line_number, 1)) {
            self.status_message = format!("Revealed symbol at line {}", line_number);
        } else {
            self.status_message = format!("No symbol at line {}", line_number);
        }
    }

    fn handle_events(&mut self) {
        for event in self.panel.take_events() {
            match event {
                OutlinePanelEvent::RevealSymbol { uri, range, .. } => {
                    self.status_message = format!("Reveal {}:{}", uri, range.start.line_number);
                    log::info!("Reveal symbol: {} {:?}", uri, range);
                }
                OutlinePanelEvent::OpenSymbol { uri, range } => {
                    self.status_message = format!("Open {}:{}", uri, range.start.line_number);
                    log::info!("Open symbol: {} {:?}", uri, range);
                }
                OutlinePanelEvent::SortOrderChanged(order) => {
                    self.status_message = order.label().to_string();
                }
            }
        }
        for error in self.errors.try_iter() {
            self.status_message = format!("Error: {}", error);
        }
    }
}

/// 不区分大小写的子串匹配，只用于演示过滤效果。
/// 匹配下标按原名称的字符计，小写化可能改变字符数。
fn score_symbol(query: &str, name: &str) -> Option<FuzzyScore> {
    let chars: Vec<char> = name.chars().collect();
    (0..chars.len()).find_map(|start| {
        let mut folded = String::new();
        for (offset, c) in chars[start..].iter().enumerate() {
            folded.extend(c.to_lowercase());
            if folded == query {
                let matches = (start..start + offset + 1).collect();
                return Some(FuzzyScore::new(query.len() as i32 * 10 - start as i32, matches));
            }
            if !query.starts_with(folded.as_str()) {
                return None;
            }
        }
        None
    })
}

impl eframe::App for OutlineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 推进异步任务：子节点加载、状态恢复、扩展名称查询
        self.pool.run_until_stalled();

        // 顶部菜单栏
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Outline Snapshot").clicked() {
                        self.open_snapshot();
                        ui.close_menu();
                    }
                    if ui.button("Load Demo").clicked() {
                        self.load_snapshot(OutlineSnapshot::from_json(DEMO_OUTLINE));
                        ui.close_menu();
                    }
                });
            });
        });

        // 底部状态栏
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
            });
        });

        // 左侧大纲
        egui::SidePanel::left("outline")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Filter:");
                    if ui.text_edit_singleline(&mut self.filter).changed() {
                        self.apply_filter();
                    }
                });
                self.panel.ui(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Go to line:");
                let response = ui.text_edit_singleline(&mut self.goto_line);
                let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Reveal").clicked() || submitted {
                    self.reveal_line();
                }
            });
            if let Some(model) = self.panel.model() {
                ui.label(format!("Document: {}", model.uri()));
            }
        });

        self.handle_events();
    }
}
