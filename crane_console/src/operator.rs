use crane_lib::{CartesianPosition, JointState, Orientation};
use eyre::Result;

pub const HELP: &str = "\
commands:
  joints <swing> <lift> <elbow> <wrist> <gripper>   move to joint target
  xyz <x> <y> <z>                                   move to cartesian target
  orient <x> <y> <z> <rotationZ>                    place the crane base
  state | pose                                      show client state / segment poses
  reconnect | close | quit";

/// One line of operator input.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorInput {
    Joints(JointState),
    Xyz(CartesianPosition),
    Orient(Orientation),
    State,
    Pose,
    Reconnect,
    Close,
    Quit,
    Help,
}

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<OperatorInput>> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    if keyword.starts_with('#') {
        return Ok(None);
    }

    let args: Vec<&str> = words.collect();
    let input = match keyword.to_lowercase().as_str() {
        "joints" | "j" => {
            let [s, l, e, w, g] = numbers::<5>(keyword, &args)?;
            OperatorInput::Joints(JointState::new(s, l, e, w, g))
        }
        "xyz" => {
            let [x, y, z] = numbers::<3>(keyword, &args)?;
            OperatorInput::Xyz(CartesianPosition::new(x, y, z))
        }
        "orient" => {
            let [x, y, z, rot] = numbers::<4>(keyword, &args)?;
            OperatorInput::Orient(Orientation::new(x, y, z, rot))
        }
        "state" | "s" => OperatorInput::State,
        "pose" | "p" => OperatorInput::Pose,
        "reconnect" => OperatorInput::Reconnect,
        "close" => OperatorInput::Close,
        "quit" | "exit" | "q" => OperatorInput::Quit,
        "help" | "?" => OperatorInput::Help,
        other => eyre::bail!("Unknown command '{}', type 'help'", other),
    };

    Ok(Some(input))
}

fn numbers<const N: usize>(keyword: &str, args: &[&str]) -> Result<[f64; N]> {
    if args.len() != N {
        eyre::bail!("'{}' takes {} numbers, got {}", keyword, N, args.len());
    }

    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg
            .parse::<f64>()
            .map_err(|_| eyre::eyre!("'{}' is not a number", arg))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_joints() {
        let input = parse_line("joints 10 1.5 -20 30 0.5").unwrap();
        assert_eq!(
            input,
            Some(OperatorInput::Joints(JointState::new(10.0, 1.5, -20.0, 30.0, 0.5)))
        );
    }

    #[test]
    fn test_parse_xyz_and_orient() {
        assert_eq!(
            parse_line("  xyz 1 2 3 ").unwrap(),
            Some(OperatorInput::Xyz(CartesianPosition::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(
            parse_line("orient 0 0 0 90").unwrap(),
            Some(OperatorInput::Orient(Orientation::new(0.0, 0.0, 0.0, 90.0)))
        );
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_line("STATE").unwrap(), Some(OperatorInput::State));
        assert_eq!(parse_line("q").unwrap(), Some(OperatorInput::Quit));
        assert_eq!(parse_line("reconnect").unwrap(), Some(OperatorInput::Reconnect));
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("# note").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("joints 1 2 3").is_err());
        assert!(parse_line("xyz 1 two 3").is_err());
        assert!(parse_line("fly").is_err());
    }

    #[test]
    fn test_out_of_range_is_left_to_validation() {
        // Parsing never clamps or rejects ranges
        let input = parse_line("joints 500 0 0 0 0").unwrap();
        assert_eq!(
            input,
            Some(OperatorInput::Joints(JointState::new(500.0, 0.0, 0.0, 0.0, 0.0)))
        );
    }
}
