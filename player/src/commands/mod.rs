use anyhow::{Result, anyhow};
use ratatui::style::Color;
use signage_core::{Settings, VideoDraft};

use crate::app::{App, AppView, PendingOp};

/// Command handler for the application
pub struct CommandHandler;

impl CommandHandler {
    /// Parse and execute a command
    pub fn execute(app: &mut App, command_str: &str) -> Result<()> {
        let parts: Vec<&str> = command_str.trim().splitn(2, ' ').collect();
        let cmd = parts[0].to_lowercase();
        let args = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty());

        match cmd.as_str() {
            "play" | "p" => {
                let index = match args {
                    Some(n) => n
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .ok_or_else(|| anyhow!("Invalid channel number: {}", n))?,
                    None => app.selected,
                };
                if index >= app.channels.len() {
                    return Err(anyhow!("No channel {}", index + 1));
                }
                app.play_channel(index);
            }
            "stop" | "x" => {
                if app.view != AppView::Player {
                    return Err(anyhow!("Nothing is playing"));
                }
                app.stop_playback();
                app.set_status("Playback stopped", Color::Blue);
            }
            "settings" | "config" => {
                if app.view == AppView::Player {
                    app.stop_playback();
                }
                app.open_settings(args.map(str::to_string));
            }
            "admin" => {
                if app.view == AppView::Player {
                    app.stop_playback();
                }
                app.open_admin();
            }
            "login" => {
                let (email, password) = args
                    .and_then(|a| a.split_once(' '))
                    .ok_or_else(|| anyhow!("Usage: login <email> <password>"))?;
                app.admin.login.email = email.to_string();
                app.admin.login.password = password.trim().to_string();
                app.open_admin();
                app.submit_login();
            }
            "logout" => app.sign_out(),
            "refresh" | "reload" | "r" => app.request_refresh(),
            "loop" => {
                let settings = Settings {
                    video_url: app.settings_form.url.clone(),
                    loop_enabled: !app.settings_form.loop_enabled,
                };
                let settings = settings
                    .validated()
                    .map_err(|e| anyhow!("No video configured: {}", e))?;
                // The form picks up the new flag from the store once saved
                app.pending = Some(PendingOp::SaveSettings(settings));
            }
            "add" => {
                let (title, url) = args
                    .and_then(|a| a.rsplit_once(' '))
                    .ok_or_else(|| anyhow!("Usage: add <title> <url>"))?;
                let draft = VideoDraft::new(title, url).validated()?;
                if app.needs_login() {
                    return Err(anyhow!("Sign in first (:login <email> <password>)"));
                }
                app.pending = Some(PendingOp::SaveVideo(draft, None));
            }
            "help" | "h" | "?" => {
                app.show_help = true;
            }
            "quit" | "exit" | "q" => {
                if app.view == AppView::Player {
                    app.stop_playback();
                }
                app.should_quit = true;
            }
            "" => {}
            _ => {
                return Err(anyhow!("Unknown command: {}", cmd));
            }
        }

        Ok(())
    }
}

/// Handle a command string entered by the user
pub fn handle_command(app: &mut App, command: &str) -> Result<()> {
    log::debug!("Executing command: {}", command);
    CommandHandler::execute(app, command)
}
