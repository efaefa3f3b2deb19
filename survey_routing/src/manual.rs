/*!

This is the long-form manual for `survey_routing` and `surveyrpt`.

## Input

A survey export, one row per respondent, one column per question. The first row holds
the questions. Both `.csv` and `.xlsx` exports are accepted; a file name given without
an extension is read as `.csv`.

The first column (the submission timestamp in Google Forms exports) is not a question.
The last columns of the form are a self-evaluation block and are never processed.
Both sizes are part of the survey schema (see below).

## Routing

Each question is filed under one recipient: the tutor, a student, or `everybody`.
The first matching rule wins:

1. The question contains a tag such as `Pontualidade [Maria]`. Google Forms writes the
   rows of a grid question this way. The question goes to the student `Maria` and is
   drawn as a chart. The folder of the student is created the first time the tag is seen.
2. The question is exactly the name of a student already seen. This is the free-text
   feedback about that student, written to their folder as a text file.
3. The question contains the tutor keyword (`tutor` by default, case-sensitive). It goes
   to the tutor folder, as a chart if the column is inside one of the tutor ranges and
   as text otherwise.
4. Any other question goes to `everybody`, as text if the column is inside one of the
   collective free-text ranges and as a chart otherwise.

A tag that is blank (`[ ]`), that would escape the results directory (`[../x]`) or that
names a shared folder (`[everybody]`, the tutor) is rejected. Only well-formed tags count:
in `Nota [] [Maria]` the tag is `Maria`. With `strictLabels`, empty questions and questions with stray brackets are
rejected too; otherwise they fall through to the collective rule.

## Outputs

```text
results/
  everybody/
    012_como_voce_avalia_o_modulo.png
    096_sugestoes.txt
  <tutor>/
  Maria/
    005_quao_satisfeito_voce_esta.png
    040_maria.txt
```

Text files list every answer under a heading `Avaliação N`, in a random order that
changes on every run, so that answers to different questions cannot be matched back to
the same respondent.

## Survey schema

All the keys are optional. The defaults are:

```json
{
  "resultsDirectory": "results",
  "everybodyDirectory": "everybody",
  "firstQuestionColumn": 1,
  "selfEvaluationColumns": 4,
  "tutorKeyword": "tutor",
  "tutorCategoricalRanges": [{ "start": 172, "end": 174 }],
  "everybodyFreeTextRanges": [
    { "start": 94, "end": 98 },
    { "start": 100, "end": 100 },
    { "start": 171, "end": 171 }
  ],
  "strictLabels": false,
  "maxFileStemLength": 30,
  "blankAnswerLabel": "(sem resposta)",
  "freeTextHeading": "Avaliação",
  "mail": {
    "smtpHost": "smtp.gmail.com",
    "smtpPort": 587,
    "maxAttempts": 3,
    "retryDelaySecs": 5
  }
}
```

A range without `end` is open: `{ "start": 175 }` covers every column from 175 on.

## Mailing the results

With `--send`, each recipient folder is zipped and every person of the mail list receives
two archives: the `everybody` one and their own. The mail list has one `name,address`
pair per line; the credentials file has a single `address,secret` line. People without a
results folder are skipped with a warning.

*/
