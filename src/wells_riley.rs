//! The Wells-Riley airborne dose-response model.
//!
//! With `N_I` infectious people sharing a well-mixed space of volume `V` and exchange rate `λ`,
//! each emitting `E` quanta per second, a susceptible person breathing `ρ` cubic meters per
//! second inhales
//!
//! ```text
//! n(t) = (ρ · N_I · E) / (V · λ) · [ t − (1 − e^(−λt)) / λ ]
//! ```
//!
//! quanta over `t` seconds, and is infected with probability `P = 1 − e^(−γ · n(t))`.

use crate::parameters::TransportProfile;

/// The air of one shared space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    /// V, cubic meters.
    pub volume: f64,
    /// λ, air exchanges per second.
    pub ventilation_rate: f64,
    /// E, quanta per second per infectious person.
    pub emission_rate: f64,
    /// ρ, cubic meters per second.
    pub inhalation_rate: f64,
}

impl Environment {
    /// The commute environment, shared by every rider regardless of where they are heading.
    #[must_use]
    pub fn transport(profile: &TransportProfile, emission_rate: f64, inhalation_rate: f64) -> Self {
        Environment {
            volume: profile.volume,
            ventilation_rate: profile.air_changes_per_hour / 3600.0,
            emission_rate,
            inhalation_rate,
        }
    }

    /// Quanta inhaled by one susceptible person over `duration_seconds` with `n_infectious`
    /// sources present. Zero for degenerate spaces.
    #[must_use]
    pub fn quanta_inhaled(&self, n_infectious: usize, duration_seconds: f64) -> f64 {
        let lambda = self.ventilation_rate;
        if n_infectious == 0 || lambda <= 0.0 || self.volume <= 0.0 || duration_seconds <= 0.0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let sources = n_infectious as f64;
        let steady_state = (self.inhalation_rate * sources * self.emission_rate)
            / (self.volume * lambda);
        // The concentration builds up from zero, so subtract the transient deficit.
        let effective_seconds =
            duration_seconds - (1.0 - (-lambda * duration_seconds).exp()) / lambda;
        steady_state * effective_seconds
    }

    /// Chance that one susceptible person is infected. Exactly zero when no quanta are inhaled.
    #[must_use]
    pub fn infection_probability(
        &self,
        n_infectious: usize,
        duration_seconds: f64,
        infectivity: f64,
    ) -> f64 {
        let quanta = self.quanta_inhaled(n_infectious, duration_seconds);
        if quanta <= 0.0 || infectivity <= 0.0 {
            return 0.0;
        }
        (1.0 - (-infectivity * quanta).exp()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_almost_eq;

    fn household() -> Environment {
        Environment {
            volume: 150.0,
            ventilation_rate: 0.5 / 3600.0,
            emission_rate: 0.02,
            inhalation_rate: 1.3e-4,
        }
    }

    #[test]
    fn matches_closed_form() {
        let env = household();
        let t = 12.0 * 3600.0;
        let lambda: f64 = 0.5 / 3600.0;
        let expected_quanta =
            (1.3e-4 * 2.0 * 0.02) / (150.0 * lambda) * (t - (1.0 - (-lambda * t).exp()) / lambda);
        assert_almost_eq!(env.quanta_inhaled(2, t), expected_quanta, 1e-12);
        assert_almost_eq!(
            env.infection_probability(2, t, 0.1),
            1.0 - (-0.1 * expected_quanta).exp(),
            1e-12
        );
    }

    #[test]
    fn degenerate_inputs_give_zero() {
        let env = household();
        assert_eq!(env.infection_probability(0, 3600.0, 1.0), 0.0);
        assert_eq!(env.infection_probability(3, 0.0, 1.0), 0.0);
        assert_eq!(env.infection_probability(3, 3600.0, 0.0), 0.0);

        let sealed = Environment {
            ventilation_rate: 0.0,
            ..household()
        };
        assert_eq!(sealed.infection_probability(3, 3600.0, 1.0), 0.0);

        let no_room = Environment {
            volume: 0.0,
            ..household()
        };
        assert_eq!(no_room.infection_probability(3, 3600.0, 1.0), 0.0);
    }

    #[test]
    fn risk_grows_with_sources_and_infectivity() {
        let env = household();
        let t = 8.0 * 3600.0;
        let mut previous = 0.0;
        for n_infectious in 1..20 {
            let p = env.infection_probability(n_infectious, t, 0.05);
            assert!(p >= previous);
            assert!(p <= 1.0);
            previous = p;
        }

        let mut previous = 0.0;
        for step in 1..20 {
            let gamma = f64::from(step) * 0.05;
            let p = env.infection_probability(3, t, gamma);
            assert!(p >= previous);
            previous = p;
        }
    }

    #[test]
    fn better_ventilation_lowers_risk() {
        let stuffy = household();
        let airy = Environment {
            ventilation_rate: 6.0 / 3600.0,
            ..household()
        };
        let t = 4.0 * 3600.0;
        assert!(airy.infection_probability(1, t, 0.5) < stuffy.infection_probability(1, t, 0.5));
    }

    #[test]
    fn transport_profile() {
        let env = Environment::transport(&TransportProfile::default(), 0.02, 1.3e-4);
        assert_almost_eq!(env.volume, 80.0, 1e-12);
        assert_almost_eq!(env.ventilation_rate, 15.0 / 3600.0, 1e-15);
        assert!(env.infection_probability(1, 3600.0, 0.05) > 0.0);
    }
}
