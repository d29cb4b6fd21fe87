#[cfg(test)]
mod tests {

    use mastermind_solver::genetic::{GeneticParams, VariationPolicy};
    use mastermind_solver::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use ron;

    #[test]
    fn game_config_serde() {
        let config = GameConfig::new(5, 8, false).unwrap();

        let ser = ron::to_string(&config);
        assert!(ser.is_ok());

        let deser = ron::from_str::<GameConfig>(&ser.unwrap());
        assert_eq!(deser.ok(), Some(config));
    }

    #[test]
    fn game_config_deserialization_validates() {
        let deser =
            ron::from_str::<GameConfig>("(width: 4, color_count: 2, allow_repeats: false)");

        assert!(deser.is_err());
    }

    #[test]
    fn genetic_params_serde_fills_defaults() {
        let deser = ron::from_str::<GeneticParams>(
            "(population_size: 500, variation_policy: Independent, max_attempts: Some(3))",
        );

        assert_eq!(
            deser.ok(),
            Some(GeneticParams {
                population_size: 500,
                variation_policy: VariationPolicy::Independent,
                max_attempts: Some(3),
                ..GeneticParams::default()
            })
        );
    }

    #[test]
    fn history_serde() -> Result<(), Box<dyn std::error::Error>> {
        let history = vec![
            Turn::new("red, green, blue, yellow".parse()?, Score::new(2, 2)),
            Turn::new("yellow, green, blue, red".parse()?, Score::new(2, 2)),
        ];

        let ser = ron::to_string(&history)?;
        let deser = ron::from_str::<Vec<Turn>>(&ser)?;

        assert_eq!(deser, history);
        Ok(())
    }

    #[test]
    fn deserialized_history_drives_guesser() -> Result<(), Box<dyn std::error::Error>> {
        let config = GameConfig::default();
        let history = ron::from_str::<Vec<Turn>>(
            "[(guess: (pegs: [Some(Red), Some(Green), Some(Blue), Some(Yellow)]), \
              score: (exact: 2, color_only: 2))]",
        )?;
        let params = GeneticParams {
            population_size: 200,
            ..GeneticParams::default()
        };
        let mut guesser = GeneticGuesser::with_params(config, params, StdRng::seed_from_u64(1))?;

        let guess = guesser.select_next_guess(&history)?;

        assert!(is_feasible(&guess, &history));
        Ok(())
    }
}
