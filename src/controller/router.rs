//! Regex based path router
use regex::Regex;

type ParamsConverter<R> = Box<Fn(Vec<&str>) -> Option<R> + Send + Sync>;

/// Routes are tried in insertion order, the first match wins.
pub struct RouteParser<R> {
    regex_and_converters: Vec<(Regex, ParamsConverter<R>)>,
}

impl<R> Default for RouteParser<R> {
    fn default() -> Self {
        Self {
            regex_and_converters: Vec::new(),
        }
    }
}

impl<R> RouteParser<R> {
    /// Adds a route without params
    pub fn add_route<F>(&mut self, regex_pattern: &str, f: F) -> &Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.add_route_with_params(regex_pattern, move |_| Some(f()))
    }

    /// Adds a route whose capture groups are handed to `converter`
    pub fn add_route_with_params<F>(&mut self, regex_pattern: &str, converter: F) -> &Self
    where
        F: Fn(Vec<&str>) -> Option<R> + Send + Sync + 'static,
    {
        match Regex::new(regex_pattern) {
            Ok(regex) => self.regex_and_converters.push((regex, Box::new(converter))),
            Err(e) => error!("Skipping invalid route pattern {}: {}", regex_pattern, e),
        }
        self
    }

    /// Tests if the route matches the path and returns the route
    pub fn test(&self, route: &str) -> Option<R> {
        self.regex_and_converters.iter().filter_map(|(regex, converter)| {
            regex.captures(route).and_then(|captures| {
                let params = captures
                    .iter()
                    .skip(1)
                    .filter_map(|capture| capture.map(|m| m.as_str()))
                    .collect::<Vec<_>>();
                converter(params)
            })
        }).next()
    }
}
