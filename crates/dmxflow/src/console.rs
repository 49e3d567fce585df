//! Line-based operator console
//!
//! Stand-in for the manual, OSC and IR collaborators: each input line is
//! parsed into a [`ConsoleCommand`] and applied to the command surface.

use dmxflow_control::{ControlEvent, Effect, EffectKind, FixtureConfig, FixtureMode, Rgb};
use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  set <head> <channel> <value>    write a head's logical channel (0-based)
  dmx <channel> <value>           write an absolute DMX channel (1-512)
  color <#RRGGBB>                 colour every head
  blackout                        zero the universe
  effect <kind>                   start ColorChase | Strobe | Rainbow | GoboPattern | AudioReactivity
  params <json>                   update the running effect, e.g. {\"effect\":\"Strobe\",\"speed\":8}
  speed <0-100>                   running effect speed
  stop                            stop the running effect
  audio <level>                   feed an audio level (0.0-1.0)
  ir                              simulate the IR sensor
  seq <file.json>                 play a sequence file
  stopseq                         stop the sequence
  save <name> | load <name> | delete <name> | scenes
  patch <9ch|14ch> <start> <heads>
  status | stats | help | quit";

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Control(ControlEvent),
    SetParameters(Effect),
    PlaySequenceFile(PathBuf),
    DeleteScene(String),
    ListScenes,
    Patch(FixtureConfig),
    Status,
    Stats,
    Help,
    Quit,
}

fn arg<'a>(args: &[&'a str], index: usize, what: &str) -> Result<&'a str, String> {
    args.get(index)
        .copied()
        .ok_or_else(|| format!("missing {}", what))
}

fn number<T: std::str::FromStr>(args: &[&str], index: usize, what: &str) -> Result<T, String> {
    let raw = arg(args, index, what)?;
    raw.parse()
        .map_err(|_| format!("invalid {}: {}", what, raw))
}

/// Parse one line. Empty lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    let mut parts = line.splitn(2, char::is_whitespace);
    let Some(keyword) = parts.next().filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    let rest = parts.next().unwrap_or_default().trim();
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match keyword.to_ascii_lowercase().as_str() {
        "set" => ConsoleCommand::Control(ControlEvent::ManualValue {
            head: number(&args, 0, "head")?,
            channel: number(&args, 1, "channel")?,
            value: number(&args, 2, "value")?,
        }),
        "dmx" => ConsoleCommand::Control(ControlEvent::DmxValue {
            channel: number(&args, 0, "channel")?,
            value: number(&args, 1, "value")?,
        }),
        "color" => {
            let raw = arg(&args, 0, "colour")?;
            let color = Rgb::from_hex(raw).ok_or_else(|| format!("invalid colour: {}", raw))?;
            ConsoleCommand::Control(ControlEvent::Color(color))
        }
        "blackout" => ConsoleCommand::Control(ControlEvent::Blackout),
        "effect" => {
            let kind: EffectKind = arg(&args, 0, "effect kind")?
                .parse()
                .map_err(|e: dmxflow_control::ControlError| e.to_string())?;
            ConsoleCommand::Control(ControlEvent::StartEffect(Effect::default_for(kind)))
        }
        "params" => {
            let effect: Effect =
                serde_json::from_str(rest).map_err(|e| format!("invalid parameters: {}", e))?;
            ConsoleCommand::SetParameters(effect)
        }
        "speed" => ConsoleCommand::Control(ControlEvent::EffectSpeed {
            percent: number(&args, 0, "speed percentage")?,
        }),
        "stop" => ConsoleCommand::Control(ControlEvent::StopEffect),
        "audio" => ConsoleCommand::Control(ControlEvent::AudioLevel(number(
            &args,
            0,
            "audio level",
        )?)),
        "ir" => ConsoleCommand::Control(ControlEvent::IrTriggered),
        "seq" => ConsoleCommand::PlaySequenceFile(PathBuf::from(arg(&args, 0, "sequence file")?)),
        "stopseq" => ConsoleCommand::Control(ControlEvent::StopSequence),
        "save" => ConsoleCommand::Control(ControlEvent::SaveScene {
            name: arg(&args, 0, "scene name")?.to_string(),
        }),
        "load" => ConsoleCommand::Control(ControlEvent::LoadScene {
            name: arg(&args, 0, "scene name")?.to_string(),
        }),
        "delete" => ConsoleCommand::DeleteScene(arg(&args, 0, "scene name")?.to_string()),
        "scenes" => ConsoleCommand::ListScenes,
        "patch" => {
            let mode = match arg(&args, 0, "mode")?.to_ascii_lowercase().as_str() {
                "9ch" | "9" => FixtureMode::NineChannel,
                "14ch" | "14" => FixtureMode::FourteenChannel,
                other => return Err(format!("unknown mode: {}", other)),
            };
            // Validated by the command surface so rejections reach the sink
            ConsoleCommand::Patch(FixtureConfig {
                mode,
                start_address: number(&args, 1, "start address")?,
                head_count: number(&args, 2, "head count")?,
            })
        }
        "status" => ConsoleCommand::Status,
        "stats" => ConsoleCommand::Stats,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command: {} (try 'help')", other)),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ConsoleCommand {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn test_manual_commands() {
        assert_eq!(
            parse("set 1 3 255"),
            ConsoleCommand::Control(ControlEvent::ManualValue {
                head: 1,
                channel: 3,
                value: 255
            })
        );
        assert_eq!(
            parse("DMX 512 -4"),
            ConsoleCommand::Control(ControlEvent::DmxValue {
                channel: 512,
                value: -4
            })
        );
        assert_eq!(
            parse("color #00FF00"),
            ConsoleCommand::Control(ControlEvent::Color(Rgb::GREEN))
        );
        assert!(parse_line("set 1 x 3").is_err());
        assert!(parse_line("set 1").is_err());
    }

    #[test]
    fn test_effect_commands() {
        match parse("effect audioreactivity") {
            ConsoleCommand::Control(ControlEvent::StartEffect(Effect::AudioReactivity(a))) => {
                assert_eq!(a.timeout_ms, None)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_line("effect laser").is_err());

        match parse(r#"params {"effect":"Strobe","speed":8.0}"#) {
            ConsoleCommand::SetParameters(effect) => assert_eq!(effect.kind(), EffectKind::Strobe),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            parse("speed 40"),
            ConsoleCommand::Control(ControlEvent::EffectSpeed { percent: 40 })
        );
    }

    #[test]
    fn test_patch_command() {
        assert_eq!(
            parse("patch 14ch 101 4"),
            ConsoleCommand::Patch(FixtureConfig {
                mode: FixtureMode::FourteenChannel,
                start_address: 101,
                head_count: 4
            })
        );
        assert!(parse_line("patch 7ch 1 1").is_err());
    }

    #[test]
    fn test_scene_and_misc_commands() {
        assert_eq!(
            parse("save intro"),
            ConsoleCommand::Control(ControlEvent::SaveScene {
                name: "intro".to_string()
            })
        );
        assert_eq!(parse("scenes"), ConsoleCommand::ListScenes);
        assert_eq!(parse("quit"), ConsoleCommand::Quit);
        assert!(parse_line("dance").is_err());
    }
}
